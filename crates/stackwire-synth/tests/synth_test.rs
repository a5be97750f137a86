//! End-to-end synthesis tests.
//!
//! Each test drives [`stackwire_synth::synthesize`] from a [`SynthConfig`]
//! the way the CLI does, then checks the finished template, environment,
//! grants, and outputs.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use stackwire_common::config::SynthConfig;
use stackwire_common::types::{OutputKey, RemovalPolicy, StackKind, Stage};
use stackwire_synth::template::{Resource, SubnetKind};
use stackwire_synth::token::Token;
use stackwire_synth::{Synthesis, Template, synthesize};

fn service_config() -> SynthConfig {
    SynthConfig {
        repository_name: "api-server-dev".into(),
        ..SynthConfig::default()
    }
}

fn subnets(template: &Template) -> Vec<(SubnetKind, String)> {
    template
        .resources
        .values()
        .filter_map(|r| match r {
            Resource::Subnet {
                kind, cidr_block, ..
            } => Some((*kind, cidr_block.clone())),
            _ => None,
        })
        .collect()
}

fn bucket_policies(template: &Template) -> Vec<RemovalPolicy> {
    template
        .resources
        .values()
        .filter_map(|r| match r {
            Resource::Bucket { removal_policy, .. } => Some(*removal_policy),
            _ => None,
        })
        .collect()
}

fn synth_service(config: &SynthConfig) -> Synthesis {
    synthesize(config, StackKind::Service).expect("service synthesis")
}

// ── Reference scenario ───────────────────────────────────────────────

#[test]
fn external_bucket_and_cache_on_new_network() {
    let config = SynthConfig {
        stage: Stage::Stage,
        vpc_id: Some(String::new()),
        vpc_cidr: "20.0.0.0/16".into(),
        bucket_name: String::new(),
        external_bucket_name: Some("out-bucket".into()),
        cache_host: Some("cache.local".into()),
        cache_port: Some("6379".into()),
        ..service_config()
    };
    let synthesis = synth_service(&config);

    let network = synthesis.network.as_ref().expect("network");
    assert!(!network.is_bound());
    assert_eq!(subnets(&synthesis.template).len(), 4);

    let storage = synthesis.storage.as_ref().expect("storage");
    assert!(!storage.owned);
    assert_eq!(storage.bucket_name, "out-bucket");
    assert!(bucket_policies(&synthesis.template).is_empty());

    let compute = synthesis.compute.as_ref().expect("compute");
    let env = compute.environment.rendered();
    assert_eq!(env["CACHE_HOST"], "cache.local");
    assert_eq!(env["CACHE_PORT"], "6379");
    assert_eq!(env["BUCKET_NAME"], "out-bucket");
    assert!(compute
        .policy
        .grants_on(&Token::literal("arn:aws:s3:::out-bucket")));

    let outputs = &synthesis.outputs;
    assert_eq!(outputs.get(OutputKey::BucketName), Some("out-bucket"));
    for key in [
        OutputKey::TaskDefArn,
        OutputKey::ServiceName,
        OutputKey::ClusterName,
        OutputKey::ClusterArn,
        OutputKey::Subnets,
        OutputKey::SecurityGroups,
    ] {
        assert!(outputs.contains(key), "missing output {key}");
    }
    assert!(!outputs.contains(OutputKey::CacheEndpoint));
    assert_eq!(outputs.get(OutputKey::ServiceName), Some("api-api-stage"));
}

// ── Network ──────────────────────────────────────────────────────────

#[test]
fn new_network_has_two_private_and_two_public_24s() {
    let synthesis = synth_service(&service_config());
    let subnets = subnets(&synthesis.template);

    let private: Vec<&str> = subnets
        .iter()
        .filter(|(k, _)| *k == SubnetKind::PrivateWithEgress)
        .map(|(_, c)| c.as_str())
        .collect();
    let public: Vec<&str> = subnets
        .iter()
        .filter(|(k, _)| *k == SubnetKind::Public)
        .map(|(_, c)| c.as_str())
        .collect();
    assert_eq!(private.len(), 2);
    assert_eq!(public.len(), 2);
    assert!(subnets.iter().all(|(_, c)| c.ends_with("/24")));
}

#[test]
fn new_network_publishes_private_then_public_subnets() {
    let synthesis = synth_service(&service_config());
    assert_eq!(
        synthesis.outputs.get(OutputKey::Subnets),
        Some(
            "${api-subnet-private-dev-a},${api-subnet-private-dev-b},\
             ${api-subnet-public-dev-a},${api-subnet-public-dev-b}"
        )
    );
}

#[test]
fn bound_network_defines_no_subnets() {
    let config = SynthConfig {
        vpc_id: Some("vpc-0123".into()),
        ..service_config()
    };
    let synthesis = synth_service(&config);
    assert!(subnets(&synthesis.template).is_empty());
    assert!(
        !synthesis
            .template
            .resources
            .values()
            .any(|r| matches!(r, Resource::Network { .. }))
    );
    assert_eq!(
        synthesis.outputs.get(OutputKey::Subnets),
        Some("${lookup:vpc-0123.PrivateSubnetIds},${lookup:vpc-0123.PublicSubnetIds}")
    );
}

#[test]
fn undersized_address_range_is_rejected() {
    let config = SynthConfig {
        vpc_cidr: "20.0.0.0/23".into(),
        ..service_config()
    };
    assert!(synthesize(&config, StackKind::Service).is_err());
}

// ── Idempotence ──────────────────────────────────────────────────────

#[test]
fn resynthesis_is_byte_identical() {
    let config = SynthConfig {
        stage: Stage::Prod,
        account: Some("123456789012".into()),
        region: Some("eu-west-1".into()),
        bucket_cors: true,
        ..service_config()
    };
    let first = synth_service(&config);
    let second = synth_service(&config);

    assert_eq!(
        first.template.to_json().expect("json"),
        second.template.to_json().expect("json")
    );
    assert_eq!(
        serde_json::to_string(&first.outputs).expect("json"),
        serde_json::to_string(&second.outputs).expect("json")
    );
    assert_eq!(first, second);
}

// ── Environment and grants ───────────────────────────────────────────

#[test]
fn environment_and_grant_track_resolved_resources() {
    let cases = [
        (true, true),
        (true, false),
        (false, true),
        (false, false),
    ];
    for (storage, cache) in cases {
        let config = SynthConfig {
            provision_storage: storage,
            provision_cache: cache,
            ..service_config()
        };
        let synthesis = synth_service(&config);
        let compute = synthesis.compute.as_ref().expect("compute");
        let env = &compute.environment;

        assert_eq!(env.contains_key("CACHE_HOST"), synthesis.cache.is_some());
        assert_eq!(env.contains_key("CACHE_PORT"), synthesis.cache.is_some());
        assert_eq!(env.contains_key("BUCKET_NAME"), synthesis.storage.is_some());
        assert_eq!(compute.policy.has_storage_grant(), env.contains_key("BUCKET_NAME"));
        assert!(env.rendered().values().all(|v| !v.is_empty()));
    }
}

#[test]
fn owned_bucket_is_granted_by_arn_reference() {
    let synthesis = synth_service(&service_config());
    let storage = synthesis.storage.as_ref().expect("storage");
    assert!(storage.owned);
    assert_eq!(storage.bucket_name, "api-output-dev");
    let compute = synthesis.compute.as_ref().expect("compute");
    assert!(compute.policy.grants_on(&storage.bucket_arn));
    assert!(compute.policy.grants_on(&storage.objects_arn()));
}

// ── Teardown policy ──────────────────────────────────────────────────

#[test]
fn owned_bucket_teardown_follows_stage() {
    for (stage, expected) in [
        (Stage::Dev, RemovalPolicy::Destroy),
        (Stage::Stage, RemovalPolicy::Destroy),
        (Stage::Prod, RemovalPolicy::Retain),
    ] {
        let config = SynthConfig {
            stage,
            ..service_config()
        };
        let synthesis = synth_service(&config);
        assert_eq!(bucket_policies(&synthesis.template), vec![expected], "{stage}");
    }
}

// ── Provisioned cache ────────────────────────────────────────────────

#[test]
fn provisioned_cache_is_published_and_wired() {
    let synthesis = synth_service(&service_config());
    let endpoint = "${api-serverless-cache-dev.Endpoint.Address}";
    assert_eq!(synthesis.outputs.get(OutputKey::CacheEndpoint), Some(endpoint));
    let env = synthesis.compute.expect("compute").environment.rendered();
    assert_eq!(env["CACHE_HOST"], endpoint);
    assert_eq!(env["CACHE_PORT"], "6379");
}

// ── Other stacks ─────────────────────────────────────────────────────

#[test]
fn registry_stack_exports_repository() {
    let config = SynthConfig {
        stage: Stage::Prod,
        ..SynthConfig::default()
    };
    let synthesis = synthesize(&config, StackKind::Registry).expect("registry synthesis");
    assert_eq!(synthesis.outputs.get(OutputKey::RepositoryName), Some("api-server-prod"));
    assert_eq!(
        synthesis.outputs.get(OutputKey::RepositoryUri),
        Some("${api-repos-server-prod.RepositoryUri}")
    );
    let exports: Vec<Option<&str>> = synthesis
        .template
        .outputs
        .values()
        .map(|o| o.export_name.as_deref())
        .collect();
    assert_eq!(exports, vec![Some("builderServerUri"), Some("builderServerRepoName")]);
}

#[test]
fn storage_stack_feeds_service_stack() {
    let storage_config = SynthConfig {
        vpc_id: Some("vpc-0123".into()),
        ..SynthConfig::default()
    };
    let upstream = synthesize(&storage_config, StackKind::Storage).expect("storage synthesis");
    assert_eq!(upstream.outputs.get(OutputKey::BucketName), Some("api-output-dev"));

    // Synthesized outputs still hold deferred references into the storage
    // template and cannot be wired into another stack.
    let mut config = SynthConfig {
        vpc_id: Some("vpc-0123".into()),
        ..service_config()
    };
    let err = config.consume_upstream(upstream.outputs.as_map()).unwrap_err();
    assert!(err.to_string().contains("cacheEndpoint"), "got: {err}");

    // Applied outputs carry the concrete endpoint.
    let mut applied = upstream.outputs.as_map().clone();
    let _ = applied.insert(
        OutputKey::CacheEndpoint,
        "api-serverless-cache-dev.abc123.cache.amazonaws.com".to_string(),
    );
    let mut config = SynthConfig {
        vpc_id: Some("vpc-0123".into()),
        ..service_config()
    };
    config.consume_upstream(&applied).expect("consume");
    let synthesis = synth_service(&config);

    assert!(bucket_policies(&synthesis.template).is_empty());
    assert!(
        !synthesis
            .template
            .resources
            .values()
            .any(|r| matches!(r, Resource::ServerlessCache { .. }))
    );
    let storage = synthesis.storage.as_ref().expect("storage");
    assert!(!storage.owned);
    assert_eq!(synthesis.outputs.get(OutputKey::BucketName), Some("api-output-dev"));
    assert!(!synthesis.outputs.contains(OutputKey::CacheEndpoint));

    let env = synthesis.compute.expect("compute").environment.rendered();
    assert_eq!(
        env["CACHE_HOST"],
        "api-serverless-cache-dev.abc123.cache.amazonaws.com"
    );
    assert_eq!(env["BUCKET_NAME"], "api-output-dev");
    assert!(env.values().all(|v| !v.contains("${")));
}

#[test]
fn opt_outs_disable_external_references() {
    let config = SynthConfig {
        provision_storage: false,
        provision_cache: false,
        external_bucket_name: Some("out-bucket".into()),
        cache_host: Some("cache.local".into()),
        ..service_config()
    };
    let synthesis = synth_service(&config);
    let compute = synthesis.compute.as_ref().expect("compute");
    assert!(compute.environment.is_empty());
    assert!(!compute.policy.has_storage_grant());
    assert!(!synthesis.outputs.contains(OutputKey::BucketName));
    assert!(!synthesis.outputs.contains(OutputKey::CacheEndpoint));
}

// ── Configuration errors ─────────────────────────────────────────────

#[test]
fn configuration_errors_fail_before_any_output() {
    let bad = [
        SynthConfig::default(),
        SynthConfig {
            vpc_cidr: "not-a-cidr".into(),
            ..service_config()
        },
        SynthConfig {
            cpu: "3".into(),
            ..service_config()
        },
        SynthConfig {
            external_bucket_name: Some("Bad_Bucket".into()),
            ..service_config()
        },
    ];
    for config in &bad {
        assert!(synthesize(config, StackKind::Service).is_err(), "{config:?}");
    }
}
