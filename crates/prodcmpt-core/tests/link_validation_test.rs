//! Integration tests for link validation of components loaded from a project directory

use prodcmpt_core::cmpt::cardinality::PROPERTY_MIN_CARDINALITY;
use prodcmpt_core::validation::{
    MSGCODE_MAX_CARDINALITY_EXCEEDS_MODEL_MAX, MSGCODE_MIN_CARDINALITY_FALLS_BELOW_MODEL_MIN,
};
use prodcmpt_core::{ConfigLoader, Repository, Severity, validate_repository};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PRODUCT_TYPE: &str = r#"
qualifiedName: model.Product
associations:
  - name: coverages
    target: model.Coverage
    minCardinality: 5
    maxCardinality: "*"
"#;

const BASIC: &str = r#"
name: ProductCmpt
attributes: { qualifiedName: products.Basic, productCmptType: model.Product }
children:
  - name: Generation
    attributes: { validFrom: "2024-01-01" }
    children:
      - name: Link
        attributes:
          id: "0"
          association: coverages
          target: coverages.A
          minCardinality: "0"
          maxCardinality: "1"
      - name: Link
        attributes:
          id: "1"
          association: coverages
          target: coverages.B
          minCardinality: "0"
          maxCardinality: "2"
"#;

const UNBOUNDED: &str = r#"
name: ProductCmpt
attributes: { qualifiedName: products.Unbounded, productCmptType: model.Product }
children:
  - name: Generation
    attributes: { validFrom: "2024-01-01" }
    children:
      - name: Link
        attributes:
          id: "0"
          association: coverages
          target: coverages.A
          minCardinality: "1"
          maxCardinality: "*"
          defaultCardinality: "1"
"#;

fn write(root: &Path, name: &str, content: &str) {
    let path = root.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn project(config: Option<&str>) -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "model/product.type.yaml", PRODUCT_TYPE);
    write(dir.path(), "products/basic.cmpt.yaml", BASIC);
    write(dir.path(), "products/unbounded.cmpt.yaml", UNBOUNDED);
    if let Some(config) = config {
        write(dir.path(), "prodcmpt.yaml", config);
    }
    dir
}

#[test]
fn test_link_maxima_below_model_min() {
    let dir = project(None);
    let (config, _) = ConfigLoader::load(None, Some(dir.path())).unwrap();
    let (repo, report) = Repository::load(&config, dir.path()).unwrap();
    assert_eq!(report.cmpt_files, 2);

    let reports = validate_repository(&repo, &config);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].cmpt, "products.Basic");

    let messages = &reports[0].messages;
    assert_eq!(messages.len(), 2);
    let objects: Vec<&str> = messages
        .messages_by_code(MSGCODE_MIN_CARDINALITY_FALLS_BELOW_MODEL_MIN)
        .iter()
        .map(|m| {
            let property = &m.invalid_properties[0];
            assert_eq!(property.property.as_deref(), Some(PROPERTY_MIN_CARDINALITY));
            property.object.as_str()
        })
        .collect();
    assert_eq!(
        objects,
        [
            "products.Basic@2024-01-01/coverages:coverages.A",
            "products.Basic@2024-01-01/coverages:coverages.B",
        ]
    );
    assert!(
        messages
            .messages_by_code(MSGCODE_MAX_CARDINALITY_EXCEEDS_MODEL_MAX)
            .is_empty()
    );
}

#[test]
fn test_configured_severity() {
    let dir = project(Some(
        r#"
validation:
  severities:
    PRODUCTCMPT_LINK-MinCardinalityFallsBelowModelMin: warning
"#,
    ));
    let (config, root) = ConfigLoader::load(None, Some(dir.path())).unwrap();
    assert!(root.join("prodcmpt.yaml").is_file());

    let (repo, _) = Repository::load(&config, dir.path()).unwrap();
    let reports = validate_repository(&repo, &config);
    assert_eq!(reports[0].messages.severity(), Some(Severity::Warning));
    assert_eq!(reports[0].errors().count(), 0);
}
