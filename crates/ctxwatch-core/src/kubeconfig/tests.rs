use super::*;

const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
  - name: cluster1
    cluster:
      server: https://cluster1.example:6443
  - name: cluster2
    cluster:
      server: https://cluster2.example:6443
      insecure-skip-tls-verify: true
  - name: no-server
    cluster: {}
users:
  - name: user1
    user:
      token: abc
  - name: user2
    user: {}
contexts:
  - name: context1
    context:
      cluster: cluster1
      user: user1
  - name: context2-1
    context:
      cluster: cluster2
      user: user2
      namespace: ns1
  - name: context2-2
    context:
      cluster: cluster2
      user: user2
      namespace: ns2
  - name: dangling
    context:
      cluster: missing
      user: user1
  - name: serverless
    context:
      cluster: no-server
      user: user1
  - name: broken
current-context: context2-1
"#;

fn load() -> KubeConfig {
    KubeConfig::from_yaml(KUBECONFIG).unwrap()
}

#[test]
fn resolves_only_complete_contexts() {
    let config = load();
    let contexts = config.resolve_contexts();
    let names: Vec<_> = contexts.keys().cloned().collect();
    assert_eq!(names, vec!["context1", "context2-1", "context2-2"]);
    assert_eq!(config.current_context.as_deref(), Some("context2-1"));
}

#[test]
fn malformed_entries_are_dropped() {
    let config = load();
    assert!(config.contexts.iter().all(|c| c.name != "broken"));
    assert_eq!(config.contexts.len(), 5);
}

#[test]
fn resolved_context_carries_cluster_info() {
    let contexts = load().resolve_contexts();
    let ctx = &contexts["context2-1"];
    assert_eq!(ctx.cluster_info, ClusterInfo { name: "cluster2".into(), server: "https://cluster2.example:6443".into() });
    assert_eq!(ctx.namespace.as_deref(), Some("ns1"));
    assert_eq!(ctx.namespace_or_default(), "ns1");
    assert_eq!(contexts["context1"].namespace_or_default(), "default");
}

#[test]
fn identity_follows_auth_attributes() {
    let before = load().resolve_contexts();
    let changed = KubeConfig::from_yaml(&KUBECONFIG.replace("token: abc", "token: xyz")).unwrap().resolve_contexts();
    assert!(!before["context1"].same_identity(&changed["context1"]));
    assert!(before["context2-1"].same_identity(&changed["context2-1"]));
}

#[test]
fn identity_follows_server_and_namespace() {
    let before = load().resolve_contexts();
    let moved = KubeConfig::from_yaml(&KUBECONFIG.replace("cluster2.example", "cluster3.example")).unwrap();
    let moved = moved.resolve_contexts();
    assert!(!before["context2-1"].same_identity(&moved["context2-1"]));
    assert!(before["context1"].same_identity(&moved["context1"]));
    assert!(!before["context2-1"].same_identity(&before["context2-2"]));
}

#[test]
fn empty_document_is_an_empty_config() {
    let config = KubeConfig::from_yaml("   \n").unwrap();
    assert!(config.resolve_contexts().is_empty());
    assert!(config.current_context.is_none());
}

#[test]
fn single_context_kubeconfig_reparses() {
    let contexts = load().resolve_contexts();
    let subset = contexts["context2-2"].to_kubeconfig();
    let text = serde_yaml::to_string(&subset).unwrap();
    let reparsed = KubeConfig::from_yaml(&text).unwrap();
    let resolved = reparsed.resolve_contexts();
    assert_eq!(resolved.len(), 1);
    assert!(resolved["context2-2"].same_identity(&contexts["context2-2"]));
    assert_eq!(reparsed.current_context.as_deref(), Some("context2-2"));
}
