//! # CRD Generator
//!
//! Prints the `NamespaceLabel` CustomResourceDefinition as YAML.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/namespacelabel.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use kube::core::CustomResourceExt;
use namespace_label_controller::crd::NamespaceLabel;

fn main() -> anyhow::Result<()> {
    let crd = NamespaceLabel::crd();
    print!("{}", serde_yaml::to_string(&crd)?);
    Ok(())
}
