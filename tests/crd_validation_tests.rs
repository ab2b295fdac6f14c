//! # CRD Validation Tests
//!
//! Sample manifests deserialize into the CRD types, and the generated
//! schemas carry the names and constraints `kubectl` relies on.

use kube::core::CustomResourceExt;
use pagerduty_operator::crd::{PagerdutyRuleset, PagerdutyService};

#[test]
fn test_service_with_secret_reference() {
    let yaml = r#"
apiVersion: core.strateos.com/v1
kind: PagerdutyService
metadata:
  name: test-service
  namespace: default
spec:
  description: Testing the operator
  escalationPolicySecret:
    name: pagerduty-policies
    key: platform
  matchLabels:
    - key: foo
      value: bar
    - key: fnord
      value: whatever
"#;

    let service: PagerdutyService =
        serde_yaml::from_str(yaml).expect("Should deserialize PagerdutyService");

    assert_eq!(service.spec.description, "Testing the operator");
    assert!(service.spec.escalation_policy.is_none());
    let secret = service.spec.escalation_policy_secret.unwrap();
    assert_eq!(secret.name, "pagerduty-policies");
    assert_eq!(secret.key, "platform");
    assert_eq!(service.spec.match_labels.len(), 2);
    assert_eq!(service.spec.match_labels[1].key, "fnord");
    assert!(service.status.is_none());
}

#[test]
fn test_service_with_literal_policy_and_status() {
    let yaml = r#"
apiVersion: core.strateos.com/v1
kind: PagerdutyService
metadata:
  name: test-service
  namespace: default
spec:
  escalationPolicy: PDAVWNR
  matchLabels:
    - key: app
      value: api
status:
  serviceID: PSERVIC
  serviceName: staging-test-service-a1b2c3
  ruleID: 0a1b2c3d
  status: SUCCESS
"#;

    let service: PagerdutyService =
        serde_yaml::from_str(yaml).expect("Should deserialize PagerdutyService with status");

    assert_eq!(service.spec.escalation_policy.as_deref(), Some("PDAVWNR"));
    assert_eq!(service.spec.description, "");
    let status = service.status.unwrap();
    assert_eq!(status.service_id(), Some("PSERVIC"));
    assert_eq!(status.rule_id(), Some("0a1b2c3d"));
    assert_eq!(status.status.as_deref(), Some("SUCCESS"));
}

#[test]
fn test_ruleset_with_status() {
    let yaml = r#"
apiVersion: core.strateos.com/v1
kind: PagerdutyRuleset
metadata:
  name: production-alerts
  namespace: default
spec:
  catchallService: platform-oncall
status:
  rulesetID: PRULE01
  created: false
  adopted: true
"#;

    let ruleset: PagerdutyRuleset =
        serde_yaml::from_str(yaml).expect("Should deserialize PagerdutyRuleset");

    assert_eq!(
        ruleset.spec.catchall_service.as_deref(),
        Some("platform-oncall")
    );
    let status = ruleset.status.unwrap();
    assert_eq!(status.ruleset_id(), Some("PRULE01"));
    assert!(status.adopted);
    assert!(!status.owns_remote());
}

#[test]
fn test_ruleset_with_empty_spec() {
    let yaml = r#"
apiVersion: core.strateos.com/v1
kind: PagerdutyRuleset
metadata:
  name: foo
spec: {}
"#;

    let ruleset: PagerdutyRuleset =
        serde_yaml::from_str(yaml).expect("Should deserialize an empty PagerdutyRuleset spec");
    assert!(ruleset.spec.catchall_service.is_none());
}

#[test]
fn test_service_crd_schema() {
    let crd = PagerdutyService::crd();

    assert_eq!(crd.spec.group, "core.strateos.com");
    assert_eq!(crd.spec.names.kind, "PagerdutyService");
    assert_eq!(crd.spec.names.plural, "pagerdutyservices");
    assert_eq!(
        crd.spec.names.short_names.as_deref(),
        Some(&["pds".to_string()][..])
    );
    assert_eq!(crd.spec.scope, "Namespaced");

    let version = &crd.spec.versions[0];
    assert_eq!(version.name, "v1");
    assert!(version
        .subresources
        .as_ref()
        .is_some_and(|s| s.status.is_some()));

    let schema = serde_json::to_value(&version.schema).unwrap();
    let spec = &schema["openAPIV3Schema"]["properties"]["spec"];
    assert_eq!(spec["required"], serde_json::json!(["matchLabels"]));
    assert_eq!(spec["properties"]["matchLabels"]["minItems"], 1);
}

#[test]
fn test_ruleset_crd_schema() {
    let crd = PagerdutyRuleset::crd();

    assert_eq!(crd.spec.names.kind, "PagerdutyRuleset");
    assert_eq!(
        crd.spec.names.short_names.as_deref(),
        Some(&["pdrs".to_string()][..])
    );

    let yaml = serde_yaml::to_string(&crd).unwrap();
    assert!(yaml.contains("rulesetID"));
    assert!(yaml.contains("catchallService"));
}
