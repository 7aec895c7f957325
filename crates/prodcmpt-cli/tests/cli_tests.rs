//! Integration tests for the prodcmpt CLI
//!
//! These tests run the binary against small projects in temporary directories

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const PRODUCT_TYPE: &str = r#"
qualifiedName: model.Product
attributes:
  - name: rate
  - name: x
    changingOverTime: false
associations:
  - name: coverages
    target: model.Coverage
    minCardinality: 5
"#;

const BASIC: &str = r#"
name: ProductCmpt
attributes: { qualifiedName: products.Basic, productCmptType: model.Product }
children:
  - name: AttributeValue
    attributes: { id: "0", property: x }
    children:
      - name: Value
        text: "1"
  - name: Generation
    attributes: { validFrom: "2024-01-01" }
    children:
      - name: AttributeValue
        attributes: { id: "1", property: rate }
        children:
          - name: Value
            text: "0.5"
      - name: Link
        attributes:
          id: "2"
          association: coverages
          target: coverages.A
          minCardinality: "0"
          maxCardinality: "1"
      - name: Link
        attributes:
          id: "3"
          association: coverages
          target: coverages.B
          minCardinality: "0"
          maxCardinality: "2"
"#;

const SUPER_TEMPLATE: &str = r#"
name: ProductCmpt
attributes: { qualifiedName: superTemplate, productCmptType: model.Product, isTemplate: "true" }
children:
  - name: AttributeValue
    attributes: { id: "0", property: x }
    children:
      - name: Value
        text: "23"
"#;

const REGULAR_TEMPLATE: &str = r#"
name: ProductCmpt
attributes:
  qualifiedName: regularTemplate
  productCmptType: model.Product
  template: superTemplate
  isTemplate: "true"
children:
  - name: AttributeValue
    attributes: { id: "0", property: x, templateValueStatus: inherited }
"#;

const PRODUCT: &str = r#"
name: ProductCmpt
attributes: { qualifiedName: productCmpt, productCmptType: model.Product, template: regularTemplate }
children:
  - name: AttributeValue
    attributes: { id: "0", property: x, templateValueStatus: inherited }
"#;

/// Helper function to create a test CLI command
#[allow(deprecated)]
fn cli(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("prodcmpt").unwrap();
    cmd.arg("--no-color").arg("-C").arg(dir);
    cmd
}

fn write(root: &Path, name: &str, content: &str) {
    let path = root.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A type and one component whose links allow fewer targets than the model requires
fn create_test_project() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "model/product.type.yaml", PRODUCT_TYPE);
    write(temp_dir.path(), "products/basic.cmpt.yaml", BASIC);
    temp_dir
}

/// Three components chained through templates
fn create_template_project() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "model/product.type.yaml", PRODUCT_TYPE);
    write(temp_dir.path(), "templates/super.cmpt.yaml", SUPER_TEMPLATE);
    write(temp_dir.path(), "templates/regular.cmpt.yaml", REGULAR_TEMPLATE);
    write(temp_dir.path(), "products/product.cmpt.yaml", PRODUCT);
    temp_dir
}

#[test]
fn test_help_command() {
    let temp_dir = TempDir::new().unwrap();
    cli(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("resolve"));
}

#[test]
fn test_version_command() {
    let temp_dir = TempDir::new().unwrap();
    cli(temp_dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(VERSION));
}

#[test]
fn test_check_reports_cardinality_errors() {
    let temp_dir = create_test_project();
    cli(temp_dir.path())
        .arg("check")
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "PRODUCTCMPT_LINK-MinCardinalityFallsBelowModelMin",
        ))
        .stdout(predicate::str::contains(
            "at products.Basic@2024-01-01/coverages:coverages.B.minCardinality",
        ))
        .stdout(predicate::str::contains("Errors: 2"));
}

#[test]
fn test_check_json_output() {
    let temp_dir = create_test_project();
    let output = cli(temp_dir.path())
        .args(["check", "--format", "json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["summary"]["cmpts_checked"], 1);
    assert_eq!(json["summary"]["errors"], 2);
    assert_eq!(json["components"][0]["cmpt"], "products.Basic");
}

#[test]
fn test_check_with_disabled_code_passes() {
    let temp_dir = create_test_project();
    write(
        temp_dir.path(),
        "prodcmpt.yaml",
        "validation:\n  disabled:\n    - PRODUCTCMPT_LINK-MinCardinalityFallsBelowModelMin\n",
    );
    cli(temp_dir.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("No issues found"));
}

#[test]
fn test_check_unknown_component() {
    let temp_dir = create_test_project();
    cli(temp_dir.path())
        .args(["check", "products.Missing"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "Unknown product component 'products.Missing'",
        ));
}

#[test]
fn test_delta_then_fix() {
    let temp_dir = create_template_project();
    // `rate` changes over time but productCmpt has no generation to hold it
    write(
        temp_dir.path(),
        "products/product.cmpt.yaml",
        &format!("{PRODUCT}  - name: Generation\n    attributes: {{ validFrom: \"2024-01-01\" }}\n"),
    );

    cli(temp_dir.path())
        .args(["delta", "productCmpt"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "MISSING_PROPERTY_VALUE rate (AttributeValue): no value stored",
        ));

    cli(temp_dir.path())
        .args(["delta", "--fix", "productCmpt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fixed productCmpt: 1 entries fixed"));

    cli(temp_dir.path())
        .args(["delta", "productCmpt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No differences found"));

    let stored = fs::read_to_string(temp_dir.path().join("products/product.cmpt.yaml")).unwrap();
    assert!(stored.contains("rate"));
}

#[test]
fn test_resolve_follows_template_chain() {
    let temp_dir = create_template_project();
    cli(temp_dir.path())
        .args(["resolve", "productCmpt", "x"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "template chain: productCmpt -> regularTemplate -> superTemplate",
        ))
        .stdout(predicate::str::contains("stored: inherited -"))
        .stdout(predicate::str::contains("template value: 23 from superTemplate"))
        .stdout(predicate::str::contains("effective: 23"));

    cli(temp_dir.path())
        .args(["resolve", "productCmpt", "unknown"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stored: nothing"))
        .stdout(predicate::str::contains("template value: none"));
}

#[test]
fn test_resolve_rejects_unknown_kind() {
    let temp_dir = create_template_project();
    cli(temp_dir.path())
        .args(["resolve", "productCmpt", "x", "--kind", "Premium"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown value kind 'Premium'"));
}

#[test]
fn test_config_init_and_show() {
    let temp_dir = TempDir::new().unwrap();
    cli(temp_dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));
    assert!(temp_dir.path().join("prodcmpt.yaml").exists());

    cli(temp_dir.path())
        .args(["config", "init"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("already exists"));

    cli(temp_dir.path())
        .args(["config", "init", "--force"])
        .assert()
        .success();

    cli(temp_dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("checkHiddenAttributes: true"))
        .stdout(predicate::str::contains("**/*.cmpt.yaml"));
}

#[test]
fn test_config_init_toml_is_discovered() {
    let temp_dir = create_test_project();
    cli(temp_dir.path())
        .args(["config", "init", "--format", "toml"])
        .assert()
        .success();
    assert!(temp_dir.path().join(".prodcmptrc.toml").exists());

    cli(temp_dir.path()).arg("check").assert().code(1);
}

#[test]
fn test_config_schema() {
    let temp_dir = TempDir::new().unwrap();
    let output = cli(temp_dir.path())
        .args(["config", "schema"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let schema: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(schema["properties"]["validation"].is_object());
}

#[test]
fn test_fix_reaches_components_based_on_fixed_template() {
    let temp_dir = TempDir::new().unwrap();
    write(
        temp_dir.path(),
        "model/plan.type.yaml",
        r#"
qualifiedName: model.Plan
attributes:
  - name: x
    changingOverTime: false
associations:
  - name: coverages
    target: model.Coverage
    changingOverTime: false
"#,
    );
    // the template keeps its link on a generation although the association is static
    write(
        temp_dir.path(),
        "templates/plan.cmpt.yaml",
        r#"
name: ProductCmpt
attributes: { qualifiedName: planTemplate, productCmptType: model.Plan, isTemplate: "true" }
children:
  - name: AttributeValue
    attributes: { id: "0", property: x }
    children:
      - name: Value
        text: "23"
  - name: Generation
    attributes: { validFrom: "2024-01-01" }
    children:
      - name: Link
        attributes: { id: "1", association: coverages, target: coverages.A }
"#,
    );
    write(
        temp_dir.path(),
        "products/plan.cmpt.yaml",
        r#"
name: ProductCmpt
attributes: { qualifiedName: plan, productCmptType: model.Plan, template: planTemplate }
children:
  - name: AttributeValue
    attributes: { id: "0", property: x, templateValueStatus: inherited }
"#,
    );

    cli(temp_dir.path())
        .args(["delta", "--fix"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fixed planTemplate: 1 entries fixed"))
        .stdout(predicate::str::contains("MISSING_TEMPLATE_LINK"))
        .stdout(predicate::str::contains("fixed plan: 1 entries fixed"));

    cli(temp_dir.path())
        .arg("delta")
        .assert()
        .success()
        .stdout(predicate::str::contains("No differences found"));

    let stored = fs::read_to_string(temp_dir.path().join("products/plan.cmpt.yaml")).unwrap();
    assert!(stored.contains("coverages.A"));
}
