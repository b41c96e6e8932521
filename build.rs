use anyhow::*;
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;
use std::env;
use std::path::PathBuf;

// Sample meshes under assets/ are mirrored into OUT_DIR so that demos and
// integration tests can resolve them next to the build artifacts.
fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets/");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let meshes = manifest_dir.join("assets");
    if !meshes.exists() {
        return Ok(());
    }

    let out_dir = env::var("OUT_DIR")?;
    let mut copy_options = CopyOptions::new();
    copy_options.overwrite = true;
    copy_items(&[meshes], out_dir, &copy_options)?;

    Ok(())
}
