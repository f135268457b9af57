// build.rs

fn main() {
    // --- Link against Xlib ---
    // pkg-config first; fall back to plain linker flags when it is missing
    // or the x11.pc file cannot be found.
    if let Err(e) = pkg_config::probe_library("x11") {
        eprintln!(
            "pkg-config failed for library 'x11' ({}). Falling back to manual linking.",
            e
        );

        println!("cargo:rustc-link-lib=X11");
        println!("cargo:rustc-link-search=/usr/lib");

        eprintln!("Manual linking flags applied. Ensure the X11 development library is installed.");
    } else {
        eprintln!("pkg-config successfully found x11. Linking configured automatically.");
    }
}
