//! Shared fixtures for integration tests.
//!
//! One namespace (`default`) with the echoheaders Service, its Endpoints
//! at 172.28.35.130:8080, and an htpasswd Secret; each test picks the
//! Ingress variant it needs.

// Not every integration test crate uses every fixture.
#![allow(dead_code)]

use ingress_remap::cluster::{ClusterState, Endpoints, Ingress, Secret, Service};
use ingress_remap::Request;
use serde_json::{json, Value};

pub const TEST_HOST: &str = "echoheaders.gce.t6x.uk";
pub const BACKEND_IP: &str = "172.28.35.130";
pub const BACKEND_PORT: u16 = 8080;

/// Honor RUST_LOG when running tests; safe to call repeatedly.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

fn endpoints_fixture() -> Value {
    json!({
        "metadata": {"namespace": "default", "name": "echoheaders"},
        "subsets": [{
            "addresses": [{"ip": BACKEND_IP, "nodeName": "node-1"}],
            "ports": [{"name": "http", "port": BACKEND_PORT, "protocol": "TCP"}]
        }]
    })
}

fn service_fixture() -> Value {
    json!({
        "metadata": {"namespace": "default", "name": "echoheaders"},
        "spec": {
            "type": "ClusterIP",
            "clusterIP": "10.3.245.77",
            "selector": {"app": "echoheaders"},
            "sessionAffinity": "None",
            "ports": [{"name": "http", "port": 80, "protocol": "TCP", "targetPort": 8080}]
        }
    })
}

fn secret_htauth_fixture() -> Value {
    json!({
        "metadata": {"namespace": "default", "name": "htauth"},
        "type": "Opaque",
        // "plaintest:plaintest\n"
        "data": {"auth": "cGxhaW50ZXN0OnBsYWludGVzdAo="}
    })
}

/// Build a cluster holding the standard backend objects plus one Ingress.
pub fn load_test_cluster(ingress: Value) -> ClusterState {
    init_tracing();
    let mut cluster = ClusterState::new();
    cluster.apply_endpoints(Endpoints::from_value(endpoints_fixture()).unwrap());
    cluster.apply_service(Service::from_value(service_fixture()).unwrap());
    cluster.apply_secret(Secret::from_value(secret_htauth_fixture()).unwrap());
    cluster.apply_ingress(Ingress::from_value(ingress).unwrap());
    cluster
}

/// An Ingress for the test host: given annotations, given path entries.
pub fn ingress_with(annotations: Value, paths: Value) -> Value {
    json!({
        "metadata": {
            "namespace": "default",
            "name": "echoheaders",
            "annotations": annotations
        },
        "spec": {"rules": [{"host": TEST_HOST, "http": {"paths": paths}}]}
    })
}

fn default_backend_path() -> Value {
    json!({"backend": {"serviceName": "echoheaders", "servicePort": 80}})
}

pub fn ingress_basic() -> Value {
    ingress_with(json!({}), json!([default_backend_path()]))
}

pub fn ingress_class(class: &str) -> Value {
    ingress_with(
        json!({"kubernetes.io/ingress.class": class}),
        json!([default_backend_path()]),
    )
}

pub fn ingress_no_host() -> Value {
    json!({
        "metadata": {"namespace": "default", "name": "echoheaders"},
        "spec": {"rules": [{"http": {"paths": [default_backend_path()]}}]}
    })
}

pub fn ingress_force_tls() -> Value {
    ingress_with(
        json!({"ingress.kubernetes.io/force-ssl-redirect": "true"}),
        json!([default_backend_path()]),
    )
}

pub fn ingress_app_root() -> Value {
    ingress_with(
        json!({"ingress.kubernetes.io/app-root": "/app/"}),
        json!([default_backend_path()]),
    )
}

pub fn ingress_rewrite_target() -> Value {
    ingress_with(
        json!({"ingress.kubernetes.io/rewrite-target": "/app"}),
        json!([{
            "path": "/foo",
            "backend": {"serviceName": "echoheaders", "servicePort": 80}
        }]),
    )
}

pub fn ingress_secure_backends() -> Value {
    ingress_with(
        json!({"ingress.kubernetes.io/secure-backends": "true"}),
        json!([default_backend_path()]),
    )
}

pub fn ingress_auth_address() -> Value {
    ingress_with(
        json!({"ingress.kubernetes.io/whitelist-source-range": "127.0.0.1/32"}),
        json!([default_backend_path()]),
    )
}

pub fn ingress_auth_basic() -> Value {
    ingress_with(
        json!({
            "ingress.kubernetes.io/auth-type": "basic",
            "ingress.kubernetes.io/auth-secret": "htauth",
            "ingress.kubernetes.io/auth-realm": "t6x.uk"
        }),
        json!([default_backend_path()]),
    )
}

pub fn ingress_auth_all() -> Value {
    ingress_with(
        json!({
            "ingress.kubernetes.io/auth-type": "basic",
            "ingress.kubernetes.io/auth-secret": "htauth",
            "ingress.kubernetes.io/whitelist-source-range": "127.0.0.1/32"
        }),
        json!([default_backend_path()]),
    )
}

pub fn ingress_ignore_params() -> Value {
    ingress_with(
        json!({"ingress.kubernetes.io/cache-ignore-query-params": "foo ba*"}),
        json!([default_backend_path()]),
    )
}

pub fn ingress_whitelist_params() -> Value {
    ingress_with(
        json!({"ingress.kubernetes.io/cache-whitelist-query-params": "quux xyzzy"}),
        json!([default_backend_path()]),
    )
}

pub fn ingress_ignore_whitelist_params() -> Value {
    ingress_with(
        json!({
            "ingress.kubernetes.io/cache-ignore-query-params": "fox ba*",
            "ingress.kubernetes.io/cache-whitelist-query-params": "quux xyzzy"
        }),
        json!([default_backend_path()]),
    )
}

/// A plain http request for the test host.
pub fn request(path: Option<&str>) -> Request {
    Request {
        protocol: "http".to_string(),
        host: TEST_HOST.to_string(),
        path: path.map(str::to_string),
        ..Default::default()
    }
}
