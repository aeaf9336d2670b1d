fn main() {
    // ndarray-linalg and lapack need a LAPACK backend; on macOS use Accelerate
    #[cfg(target_os = "macos")]
    {
        println!("cargo:rustc-link-lib=framework=Accelerate");
    }
}
