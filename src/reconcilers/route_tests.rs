// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `route.rs`

#[cfg(test)]
mod tests {
    use super::super::reconcile_route;
    use crate::constants::{
        ANNOTATION_HOSTS, ANNOTATION_MANAGED_HOSTS, ANNOTATION_REGISTER, ANNOTATION_TARGET_IP,
        FINALIZER_DNS_CLEANUP,
    };
    use crate::crd::{HTTPRoute, HTTPRouteSpec, TCPRoute, TCPRouteSpec};
    use crate::dns_errors::PiholeError;
    use crate::pihole::DnsRecord;
    use crate::reconcilers::fakes::{FakeDns, FakeObjectStore};
    use crate::reconcilers::finalizers::has_finalizer;
    use crate::reconcilers::ReconcileError;
    use crate::routing::RoutingObject;
    use k8s_openapi::api::networking::v1::{Ingress, IngressRule, IngressSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
    use kube::ResourceExt;
    use std::collections::BTreeMap;
    use std::time::Duration;

    const NS: &str = "default";
    const NAME: &str = "web";
    const DEFAULT_IP: &str = "192.168.1.100";

    // =====================================================
    // Helper Functions
    // =====================================================

    fn metadata(annotations: &[(&str, &str)]) -> ObjectMeta {
        ObjectMeta {
            name: Some(NAME.to_string()),
            namespace: Some(NS.to_string()),
            annotations: Some(
                annotations
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect::<BTreeMap<_, _>>(),
            ),
            ..Default::default()
        }
    }

    fn ingress(annotations: &[(&str, &str)], spec_hosts: &[&str]) -> Ingress {
        Ingress {
            metadata: metadata(annotations),
            spec: Some(IngressSpec {
                rules: Some(
                    spec_hosts
                        .iter()
                        .map(|host| IngressRule {
                            host: Some((*host).to_string()),
                            ..Default::default()
                        })
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn registered(hosts: &str) -> Ingress {
        ingress(
            &[(ANNOTATION_REGISTER, "true"), (ANNOTATION_HOSTS, hosts)],
            &[],
        )
    }

    fn store_with<K: RoutingObject>(object: &K) -> FakeObjectStore<K> {
        let objects = FakeObjectStore::new();
        objects.insert(object);
        objects
    }

    async fn reconcile<K: RoutingObject>(
        objects: &FakeObjectStore<K>,
        dns: &FakeDns,
    ) -> Result<(), ReconcileError> {
        reconcile_route::<K>(objects, dns, DEFAULT_IP, NS, NAME).await
    }

    fn managed<K: RoutingObject>(objects: &FakeObjectStore<K>) -> Option<String> {
        objects
            .current(NS, NAME)
            .and_then(|object| object.annotations().get(ANNOTATION_MANAGED_HOSTS).cloned())
    }

    fn set_annotation(objects: &FakeObjectStore<Ingress>, key: &str, value: Option<&str>) {
        objects.edit(NS, NAME, |object| {
            let annotations = object.annotations_mut();
            match value {
                Some(value) => annotations.insert(key.to_string(), value.to_string()),
                None => annotations.remove(key),
            };
        });
    }

    fn api_error(status: u16) -> PiholeError {
        PiholeError::Api {
            status,
            message: "injected".to_string(),
        }
    }

    // =====================================================
    // Lifecycle
    // =====================================================

    #[tokio::test]
    async fn test_missing_object_is_noop() {
        let objects = FakeObjectStore::<Ingress>::new();
        let dns = FakeDns::default();

        reconcile(&objects, &dns).await.expect("missing object");
        assert!(dns.calls().is_empty());
    }

    #[tokio::test]
    async fn test_first_reconcile_adds_finalizer_and_creates_records() {
        let objects = store_with(&registered("app.local"));
        let dns = FakeDns::default();

        reconcile(&objects, &dns).await.expect("reconcile");

        let object = objects.current(NS, NAME).expect("object exists");
        assert!(has_finalizer(&object, FINALIZER_DNS_CLEANUP));
        assert_eq!(dns.records(), vec![DnsRecord::new("app.local", DEFAULT_IP)]);
        assert_eq!(managed(&objects).as_deref(), Some("app.local"));

        // The finalizer patch must be durable before the first DNS mutation
        let first_patch = &objects.patches()[0];
        assert_eq!(
            first_patch["metadata"]["finalizers"][0],
            FINALIZER_DNS_CLEANUP
        );
        assert!(first_patch["metadata"]["resourceVersion"].is_string());
    }

    #[tokio::test]
    async fn test_end_to_end_register_extend_unregister() {
        let objects = store_with(&registered("app.local"));
        let dns = FakeDns::default();

        reconcile(&objects, &dns).await.expect("first reconcile");
        assert_eq!(dns.mutations(), vec!["create app.local 192.168.1.100"]);

        set_annotation(&objects, ANNOTATION_HOSTS, Some("app.local,api.local"));
        dns.clear_calls();
        reconcile(&objects, &dns).await.expect("second reconcile");
        assert_eq!(dns.mutations(), vec!["create api.local 192.168.1.100"]);
        assert_eq!(managed(&objects).as_deref(), Some("app.local,api.local"));

        set_annotation(&objects, ANNOTATION_REGISTER, None);
        dns.clear_calls();
        reconcile(&objects, &dns).await.expect("third reconcile");
        assert_eq!(
            dns.mutations(),
            vec!["delete app.local", "delete api.local"]
        );
        assert!(dns.records().is_empty());

        let object = objects.current(NS, NAME).expect("object still exists");
        assert!(!has_finalizer(&object, FINALIZER_DNS_CLEANUP));
        assert_eq!(managed(&objects), None);
    }

    #[tokio::test]
    async fn test_second_reconcile_is_idempotent() {
        let objects = store_with(&registered("app.local,api.local"));
        let dns = FakeDns::default();

        reconcile(&objects, &dns).await.expect("first reconcile");
        let patches_after_first = objects.patches().len();
        dns.clear_calls();

        reconcile(&objects, &dns).await.expect("second reconcile");
        assert!(dns.mutations().is_empty(), "got {:?}", dns.mutations());
        assert_eq!(objects.patches().len(), patches_after_first);
    }

    #[tokio::test]
    async fn test_deletion_cleans_up_and_releases_object() {
        let objects = store_with(&registered("app.local"));
        let dns = FakeDns::default();
        reconcile(&objects, &dns).await.expect("sync");

        objects.edit(NS, NAME, |object| {
            object.metadata.deletion_timestamp = Some(Time(Default::default()));
        });
        dns.clear_calls();
        reconcile(&objects, &dns).await.expect("cleanup");

        assert_eq!(dns.mutations(), vec!["delete app.local"]);
        assert!(dns.records().is_empty());
        assert!(
            objects.current(NS, NAME).is_none(),
            "object should be released once the finalizer is gone"
        );
    }

    #[tokio::test]
    async fn test_deleting_without_finalizer_is_noop() {
        let mut object = registered("app.local");
        object.metadata.deletion_timestamp = Some(Time(Default::default()));
        object.metadata.finalizers = Some(vec!["other.io/finalizer".to_string()]);
        let objects = store_with(&object);
        let dns = FakeDns::default();

        reconcile(&objects, &dns).await.expect("noop");
        assert!(dns.calls().is_empty());
        assert!(objects.patches().is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_without_finalizer_is_noop() {
        let objects = store_with(&ingress(&[(ANNOTATION_HOSTS, "app.local")], &[]));
        let dns = FakeDns::default();

        reconcile(&objects, &dns).await.expect("noop");
        assert!(dns.calls().is_empty());
        assert!(objects.patches().is_empty());
    }

    #[tokio::test]
    async fn test_register_value_must_be_exact() {
        let objects = store_with(&ingress(
            &[(ANNOTATION_REGISTER, "TRUE"), (ANNOTATION_HOSTS, "app.local")],
            &[],
        ));
        let dns = FakeDns::default();

        reconcile(&objects, &dns).await.expect("noop");
        assert!(dns.calls().is_empty());
    }

    // =====================================================
    // Desired state
    // =====================================================

    #[tokio::test]
    async fn test_spec_hosts_used_without_override() {
        let objects = store_with(&ingress(
            &[(ANNOTATION_REGISTER, "true")],
            &["b.local", "a.local"],
        ));
        let dns = FakeDns::default();

        reconcile(&objects, &dns).await.expect("reconcile");
        assert_eq!(
            dns.mutations(),
            vec!["create b.local 192.168.1.100", "create a.local 192.168.1.100"]
        );
        assert_eq!(managed(&objects).as_deref(), Some("b.local,a.local"));
    }

    #[tokio::test]
    async fn test_no_hosts_is_noop_after_finalizer() {
        let objects = store_with(&ingress(&[(ANNOTATION_REGISTER, "true")], &[]));
        let dns = FakeDns::default();

        reconcile(&objects, &dns).await.expect("noop");

        assert!(dns.calls().is_empty());
        let object = objects.current(NS, NAME).expect("object");
        assert!(has_finalizer(&object, FINALIZER_DNS_CLEANUP));
    }

    #[tokio::test]
    async fn test_invalid_target_ip_is_logged_not_requeued() {
        let objects = store_with(&ingress(
            &[
                (ANNOTATION_REGISTER, "true"),
                (ANNOTATION_HOSTS, "app.local"),
                (ANNOTATION_TARGET_IP, "::1"),
            ],
            &[],
        ));
        let dns = FakeDns::default();

        reconcile(&objects, &dns)
            .await
            .expect("invalid annotation is not an error");
        assert!(dns.calls().is_empty());
        assert_eq!(managed(&objects), None);
    }

    #[tokio::test]
    async fn test_target_ip_override() {
        let objects = store_with(&ingress(
            &[
                (ANNOTATION_REGISTER, "true"),
                (ANNOTATION_HOSTS, "app.local"),
                (ANNOTATION_TARGET_IP, "10.0.0.7"),
            ],
            &[],
        ));
        let dns = FakeDns::default();

        reconcile(&objects, &dns).await.expect("reconcile");
        assert_eq!(dns.records(), vec![DnsRecord::new("app.local", "10.0.0.7")]);
    }

    #[tokio::test]
    async fn test_duplicate_hosts_create_once() {
        let objects = store_with(&registered("app.local, app.local"));
        let dns = FakeDns::default();

        reconcile(&objects, &dns).await.expect("reconcile");
        assert_eq!(dns.mutations(), vec!["create app.local 192.168.1.100"]);
        assert_eq!(managed(&objects).as_deref(), Some("app.local"));
    }

    // =====================================================
    // Diffing against Pi-hole
    // =====================================================

    #[tokio::test]
    async fn test_changed_address_is_replaced() {
        let objects = store_with(&ingress(
            &[
                (ANNOTATION_REGISTER, "true"),
                (ANNOTATION_HOSTS, "app.local"),
                (ANNOTATION_TARGET_IP, "10.0.0.2"),
                (ANNOTATION_MANAGED_HOSTS, "app.local"),
            ],
            &[],
        ));
        let dns = FakeDns::with_records(&[("app.local", "10.0.0.1")]);

        reconcile(&objects, &dns).await.expect("reconcile");
        assert_eq!(
            dns.mutations(),
            vec!["delete app.local", "create app.local 10.0.0.2"]
        );
        assert_eq!(dns.records(), vec![DnsRecord::new("app.local", "10.0.0.2")]);
    }

    #[tokio::test]
    async fn test_stale_managed_hosts_are_pruned() {
        let objects = store_with(&ingress(
            &[
                (ANNOTATION_REGISTER, "true"),
                (ANNOTATION_HOSTS, "app.local"),
                (ANNOTATION_MANAGED_HOSTS, "app.local,old.local"),
            ],
            &[],
        ));
        let dns =
            FakeDns::with_records(&[("app.local", DEFAULT_IP), ("old.local", DEFAULT_IP)]);

        reconcile(&objects, &dns).await.expect("reconcile");
        assert_eq!(dns.mutations(), vec!["delete old.local"]);
        assert_eq!(managed(&objects).as_deref(), Some("app.local"));
    }

    #[tokio::test]
    async fn test_unmanaged_records_are_never_touched() {
        let objects = store_with(&registered("app.local"));
        let dns = FakeDns::with_records(&[("manual.local", "10.9.9.9")]);

        reconcile(&objects, &dns).await.expect("sync");
        set_annotation(&objects, ANNOTATION_REGISTER, None);
        reconcile(&objects, &dns).await.expect("cleanup");

        assert_eq!(
            dns.records(),
            vec![DnsRecord::new("manual.local", "10.9.9.9")]
        );
    }

    // =====================================================
    // Failure classification
    // =====================================================

    #[tokio::test]
    async fn test_bad_request_on_create_is_not_requeued() {
        let objects = store_with(&registered("app.local"));
        let dns = FakeDns::default();
        dns.fail("create", api_error(400));

        let err = reconcile(&objects, &dns).await.expect_err("create fails");
        assert_eq!(err.requeue_after(), None);
        assert_eq!(managed(&objects), None);
    }

    #[tokio::test]
    async fn test_transient_create_failures_are_requeued() {
        let transient = [
            api_error(500),
            api_error(503),
            PiholeError::Timeout {
                url: "http://pihole.lan/api/config/dns/hosts".to_string(),
            },
        ];
        for error in transient {
            let objects = store_with(&registered("app.local"));
            let dns = FakeDns::default();
            dns.fail("create", error.clone());

            let err = reconcile(&objects, &dns).await.expect_err("create fails");
            let delay = err.requeue_after().expect("should be requeued");
            assert!(delay > Duration::ZERO, "{error:?} requeue delay");
        }
    }

    #[tokio::test]
    async fn test_list_failure_is_requeued() {
        let objects = store_with(&registered("app.local"));
        let dns = FakeDns::default();
        dns.fail(
            "list",
            PiholeError::Transport {
                url: "http://pihole.lan".to_string(),
                reason: "connection refused".to_string(),
            },
        );

        let err = reconcile(&objects, &dns).await.expect_err("list fails");
        assert_eq!(err.requeue_after(), Some(Duration::from_secs(30)));
        assert!(dns.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_failed_cleanup_keeps_finalizer() {
        let objects = store_with(&registered("app.local"));
        let dns = FakeDns::default();
        reconcile(&objects, &dns).await.expect("sync");

        set_annotation(&objects, ANNOTATION_REGISTER, None);
        dns.fail("delete", api_error(500));
        let err = reconcile(&objects, &dns).await.expect_err("delete fails");
        assert!(err.is_retryable());

        let object = objects.current(NS, NAME).expect("object");
        assert!(has_finalizer(&object, FINALIZER_DNS_CLEANUP));
        assert_eq!(managed(&objects).as_deref(), Some("app.local"));

        dns.clear_failures();
        reconcile(&objects, &dns).await.expect("cleanup retry");
        assert!(dns.records().is_empty());
    }

    #[tokio::test]
    async fn test_conflict_on_finalizer_is_requeued_before_dns_calls() {
        let objects = store_with(&registered("app.local"));
        let dns = FakeDns::default();
        objects.fail_next_patches_with_conflict(1);

        let err = reconcile(&objects, &dns).await.expect_err("conflict");
        assert!(matches!(err, ReconcileError::Conflict(_)));
        assert_eq!(err.requeue_after(), Some(Duration::from_secs(1)));
        assert!(dns.calls().is_empty());

        reconcile(&objects, &dns).await.expect("retry succeeds");
        assert_eq!(dns.records().len(), 1);
    }

    #[tokio::test]
    async fn test_managed_hosts_write_failure_is_requeued_shortly() {
        let mut object = registered("app.local");
        object.metadata.finalizers = Some(vec![FINALIZER_DNS_CLEANUP.to_string()]);
        let objects = store_with(&object);
        let dns = FakeDns::default();
        objects.fail_next_patches_with_conflict(1);

        let err = reconcile(&objects, &dns).await.expect_err("write fails");
        assert!(matches!(err, ReconcileError::ManagedHosts(_)));
        assert_eq!(err.requeue_after(), Some(Duration::from_secs(10)));
        assert_eq!(dns.records().len(), 1);

        dns.clear_calls();
        reconcile(&objects, &dns).await.expect("retry succeeds");
        assert!(dns.mutations().is_empty());
        assert_eq!(managed(&objects).as_deref(), Some("app.local"));
    }

    // =====================================================
    // Other kinds
    // =====================================================

    #[tokio::test]
    async fn test_http_route_hostnames() {
        let mut route = HTTPRoute::new(
            NAME,
            HTTPRouteSpec {
                hostnames: Some(vec!["route.local".to_string()]),
            },
        );
        route.metadata = metadata(&[(ANNOTATION_REGISTER, "true")]);
        let objects = store_with(&route);
        let dns = FakeDns::default();

        reconcile(&objects, &dns).await.expect("reconcile");
        assert_eq!(dns.records(), vec![DnsRecord::new("route.local", DEFAULT_IP)]);
    }

    #[tokio::test]
    async fn test_tcp_route_needs_hosts_annotation() {
        let mut route = TCPRoute::new(NAME, TCPRouteSpec {});
        route.metadata = metadata(&[(ANNOTATION_REGISTER, "true")]);
        let objects = store_with(&route);
        let dns = FakeDns::default();

        reconcile(&objects, &dns).await.expect("no hosts");
        assert!(dns.calls().is_empty());

        let mut route = TCPRoute::new(NAME, TCPRouteSpec {});
        route.metadata = metadata(&[
            (ANNOTATION_REGISTER, "true"),
            (ANNOTATION_HOSTS, "db.local"),
        ]);
        let objects = store_with(&route);

        reconcile(&objects, &dns).await.expect("reconcile");
        assert_eq!(dns.records(), vec![DnsRecord::new("db.local", DEFAULT_IP)]);
    }
}
