//! # Config Module Unit Tests / Config 模块单元测试
//!
//! Unit tests for the configuration-parameter lookup chain.
//!
//! 针对配置参数查询链的单元测试。

use std::collections::HashMap;
use std::sync::Arc;

use hierarchy_runner::core::config::{
    ConfigurationParameters, PARALLELISM_PROPERTY, PARALLEL_ENABLED_PROPERTY,
};

fn params(pairs: &[(&str, &str)]) -> ConfigurationParameters {
    let values: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ConfigurationParameters::from_map(values)
}

#[test]
fn empty_parameters_miss_every_key() {
    let empty = ConfigurationParameters::empty();
    assert!(empty.is_empty());
    assert_eq!(empty.get(PARALLELISM_PROPERTY), None);
    assert_eq!(empty.get_boolean(PARALLEL_ENABLED_PROPERTY), None);
}

#[test]
fn explicit_values_are_found() {
    let config = params(&[(PARALLELISM_PROPERTY, "8")]);
    assert_eq!(config.get(PARALLELISM_PROPERTY), Some("8"));
    assert_eq!(config.get_usize(PARALLELISM_PROPERTY), Some(8));
}

#[test]
fn lookup_falls_through_to_the_parent_chain() {
    let grandparent = Arc::new(params(&[("a", "from-grandparent"), ("b", "shadowed")]));
    let parent = Arc::new(params(&[("b", "from-parent")]).with_parent(grandparent));
    let child = params(&[("c", "from-child")]).with_parent(parent);

    assert_eq!(child.get("c"), Some("from-child"));
    assert_eq!(child.get("b"), Some("from-parent"));
    assert_eq!(child.get("a"), Some("from-grandparent"));
    assert_eq!(child.get("missing"), None);
}

#[test]
fn boolean_parsing_accepts_only_true_and_false() {
    let config = params(&[
        ("yes", "true"),
        ("no", "false"),
        ("junk", "definitely"),
    ]);
    assert_eq!(config.get_boolean("yes"), Some(true));
    assert_eq!(config.get_boolean("no"), Some(false));
    assert_eq!(config.get_boolean("junk"), None);
    assert_eq!(config.get_boolean("missing"), None);
}

#[test]
fn unparseable_integers_are_treated_as_absent() {
    let config = params(&[(PARALLELISM_PROPERTY, "a few")]);
    assert_eq!(config.get_usize(PARALLELISM_PROPERTY), None);
}
