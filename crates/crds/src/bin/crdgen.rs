//! Prints the `Image` CustomResourceDefinition as YAML.
//!
//! Usage: `cargo run -p crds --bin crdgen > image-crd.yaml`

use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crd = crds::Image::crd();
    print!("{}", serde_yaml::to_string(&crd)?);
    Ok(())
}
