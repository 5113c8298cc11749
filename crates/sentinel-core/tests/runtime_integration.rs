//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! End-to-end tests of the SentinelCore runtime

use sentinel_auth::{AuthResult, BackendKind, ContextFlags, ExternalAuthority, SubjectId};
use sentinel_config::store::persist_document;
use sentinel_config::{RoleConfig, SentinelConfig, CONFIG_YAML};
use sentinel_core::{
    HostRuntime, Invoker, RuntimeOptions, SentinelRuntime, AUDIT_TOGGLE_NODE,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn moderator_config(moderator: Uuid) -> SentinelConfig {
    let mut config = SentinelConfig::default();
    config.permissions.roles.insert(
        "moderator".to_string(),
        RoleConfig::new(
            &["sentinelcore.*"],
            &["sentinelcore.admin", "sentinelcore.admin.*"],
            &["default"],
        ),
    );
    config
        .permissions
        .user_roles
        .insert(moderator.to_string(), "moderator".to_string());
    config
}

async fn start(config_dir: &Path, config: &SentinelConfig) -> SentinelRuntime {
    std::fs::create_dir_all(config_dir).unwrap();
    persist_document(&config_dir.join(CONFIG_YAML), config)
        .await
        .unwrap();
    SentinelRuntime::init(RuntimeOptions::new(config_dir).with_watcher(false))
        .await
        .unwrap()
}

#[derive(Debug, Default)]
struct OperatorHost {
    operators: HashSet<SubjectId>,
}

impl HostRuntime for OperatorHost {
    fn is_platform_privileged(&self, subject: &SubjectId) -> bool {
        self.operators.contains(subject)
    }
}

#[derive(Debug)]
struct OfflineAuthority;

impl ExternalAuthority for OfflineAuthority {
    fn name(&self) -> &str {
        "offline"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn check(&self, _: &SubjectId, _: &str, _: &ContextFlags) -> AuthResult<bool> {
        Ok(true)
    }

    fn primary_group(&self, _: &SubjectId) -> AuthResult<String> {
        Ok("external".to_string())
    }

    fn set_primary_group(&self, _: &SubjectId, _: &str) -> AuthResult<()> {
        Ok(())
    }

    fn inherited_groups(&self, _: &SubjectId) -> AuthResult<Vec<String>> {
        Ok(vec!["external".to_string()])
    }

    fn group_exists(&self, _: &str) -> AuthResult<bool> {
        Ok(true)
    }
}

/// Authority granting a fixed set of nodes and counting lookups
#[derive(Debug, Default)]
struct CountingAuthority {
    granted: Vec<String>,
    checks: AtomicUsize,
}

impl ExternalAuthority for CountingAuthority {
    fn name(&self) -> &str {
        "counting"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn check(&self, _: &SubjectId, node: &str, _: &ContextFlags) -> AuthResult<bool> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.granted.iter().any(|granted| granted == node))
    }

    fn primary_group(&self, _: &SubjectId) -> AuthResult<String> {
        Ok("external".to_string())
    }

    fn set_primary_group(&self, _: &SubjectId, _: &str) -> AuthResult<()> {
        Ok(())
    }

    fn inherited_groups(&self, _: &SubjectId) -> AuthResult<Vec<String>> {
        Ok(vec!["external".to_string()])
    }

    fn group_exists(&self, _: &str) -> AuthResult<bool> {
        Ok(true)
    }
}

#[tokio::test]
async fn moderator_inherits_default_with_scoped_wildcard() {
    let dir = tempfile::tempdir().unwrap();
    let moderator = Uuid::new_v4();
    let mut config = SentinelConfig::default();
    config.permissions.roles.insert(
        "moderator".to_string(),
        RoleConfig::new(&["x.mod.*"], &[], &["default"]),
    );
    config
        .permissions
        .user_roles
        .insert(moderator.to_string(), "moderator".to_string());
    let runtime = start(&dir.path().join("config"), &config).await;

    runtime.on_subject_connect(moderator, "Mod");
    let permissions = runtime.permissions();
    assert!(permissions.authorized_in_context(&moderator, "x.mod.kick"));
    assert!(!permissions.authorized_in_context(&moderator, "x.admin.ban"));
    assert!(!permissions.authorized_in_context(&moderator, "x.modx.kick"));
    assert_eq!(
        permissions.inherited_groups(&moderator),
        vec!["moderator".to_string(), "default".to_string()]
    );

    runtime.shutdown().await;
}

#[tokio::test]
async fn moderator_can_use_wildcard_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let moderator = Uuid::new_v4();
    let runtime = start(&dir.path().join("config"), &moderator_config(moderator)).await;

    let context = runtime.on_subject_connect(moderator, "Mod");
    assert_eq!(context.group(), "moderator");
    assert!(!context.is_elevated());

    let permissions = runtime.permissions();
    assert!(permissions.authorized_in_context(&moderator, "sentinelcore.audit.tail"));
    assert!(permissions.authorized_in_context(&moderator, "SentinelCore.Logs"));
    assert!(permissions.authorized_in_context(&moderator, "sentinelcore.foo.bar"));
    assert!(!permissions.authorized_in_context(&moderator, "sentinelcoreX.foo"));
    assert!(!permissions.authorized_in_context(&moderator, "sentinelcore.admin.reload"));

    let admin = runtime.admin();
    let mod_invoker = Invoker::subject(moderator, "Mod");
    assert!(admin.tail_audit(&mod_invoker, Some(5)).await.success);
    assert!(!admin.reload_config(&mod_invoker).await.success);

    let stranger = Invoker::subject(Uuid::new_v4(), "Stranger");
    assert!(!admin.tail_audit(&stranger, None).await.success);

    runtime.on_subject_disconnect(&moderator);
    assert!(runtime.contexts().peek(&moderator).is_none());
    runtime.shutdown().await;
}

#[tokio::test]
async fn audit_toggle_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = start(&dir.path().join("config"), &SentinelConfig::default()).await;
    let admin = runtime.admin();

    let off = admin.toggle_audit(&Invoker::Console, false).await;
    assert!(off.success);
    let probe = admin
        .test_permission(&Invoker::Console, Uuid::new_v4(), "sentinelcore.logs")
        .await;
    assert!(probe.success);
    assert!(!dir.path().join("logs/sentinel").exists());

    assert!(admin.toggle_audit(&Invoker::Console, true).await.success);
    let tail = admin.tail_audit(&Invoker::Console, Some(20)).await;
    assert!(tail.success);
    assert_eq!(tail.details.len(), 1);
    assert!(tail.details[0].contains("\"type\":\"audit_toggle\""));
    assert!(tail.message.starts_with("Shown 1 lines from audit-"));

    runtime.shutdown().await;
}

#[tokio::test]
async fn audit_stays_off_across_config_updates() {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("config");
    let runtime = start(&config_dir, &moderator_config(Uuid::new_v4())).await;
    let admin = runtime.admin();
    let mut changes = runtime.store().subscribe();

    assert!(admin.toggle_audit(&Invoker::Console, false).await.success);
    let subject = Uuid::new_v4();
    let assigned = admin
        .assign_role(&Invoker::Console, subject, "moderator")
        .await;
    assert!(assigned.success, "{}", assigned.message);
    assert!(admin.reload_config(&Invoker::Console).await.success);

    // Let the audit follower observe both snapshots
    for _ in 0..2 {
        tokio::time::timeout(Duration::from_secs(5), changes.recv())
            .await
            .expect("snapshot published")
            .unwrap();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!runtime.audit().is_enabled());
    let outcome = runtime
        .audit()
        .record_action(None, None, "/ban griefer", Default::default())
        .await;
    assert_eq!(outcome, sentinel_audit::RecordOutcome::Disabled);
    assert!(!dir.path().join("logs/sentinel").exists());

    runtime.shutdown().await;
}

#[tokio::test]
async fn disconnect_drops_mirror_cache() {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    let mut config = SentinelConfig::default();
    config.permissions.backend = "mirror".to_string();
    persist_document(&config_dir.join(CONFIG_YAML), &config)
        .await
        .unwrap();

    let authority = Arc::new(CountingAuthority {
        granted: vec!["chat.talk".to_string()],
        ..CountingAuthority::default()
    });
    let runtime = SentinelRuntime::init(
        RuntimeOptions::new(&config_dir)
            .with_watcher(false)
            .with_authority(authority.clone()),
    )
    .await
    .unwrap();
    assert_eq!(runtime.registry().active_kind(), Some(BackendKind::Mirror));
    let mirror = runtime.registry().mirror().unwrap();

    let subject = Uuid::new_v4();
    runtime.on_subject_connect(subject, "Visitor");
    assert!(runtime.permissions().authorized_in_context(&subject, "chat.talk"));
    assert!(runtime.permissions().authorized_in_context(&subject, "chat.talk"));
    assert_eq!(authority.checks.load(Ordering::SeqCst), 1);
    assert_eq!(mirror.cached_decisions(), 1);

    runtime.on_authority_update(&subject);
    assert_eq!(mirror.cached_decisions(), 0);
    assert_eq!(runtime.contexts().get(&subject).group(), "external");

    assert!(runtime.permissions().authorized_in_context(&subject, "chat.talk"));
    assert_eq!(mirror.cached_decisions(), 1);
    runtime.on_subject_disconnect(&subject);
    assert_eq!(mirror.cached_decisions(), 0);
    assert!(runtime.contexts().peek(&subject).is_none());

    runtime.shutdown().await;
}

#[tokio::test]
async fn assign_role_persists_and_refuses_unknown_roles() {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("config");
    let runtime = start(&config_dir, &moderator_config(Uuid::new_v4())).await;
    let admin = runtime.admin();
    let subject = Uuid::new_v4();
    runtime.on_subject_connect(subject, "Newcomer");

    let refused = admin
        .assign_role(&Invoker::Console, subject, "ghost")
        .await;
    assert!(!refused.success);
    assert!(!runtime
        .config()
        .permissions
        .user_roles
        .contains_key(&subject.to_string()));

    let assigned = admin
        .assign_role(&Invoker::Console, subject, "moderator")
        .await;
    assert!(assigned.success, "{}", assigned.message);
    assert_eq!(runtime.permissions().group(&subject), "moderator");
    assert_eq!(runtime.contexts().get(&subject).group(), "moderator");

    let on_disk = sentinel_config::store::load_document(&config_dir.join(CONFIG_YAML))
        .await
        .unwrap();
    assert_eq!(
        on_disk.permissions.user_roles.get(&subject.to_string()),
        Some(&"moderator".to_string())
    );

    // The assignment survives a reload from disk
    assert!(admin.reload_config(&Invoker::Console).await.success);
    assert_eq!(runtime.permissions().group(&subject), "moderator");

    runtime.shutdown().await;
}

#[tokio::test]
async fn platform_operators_bypass_except_exempt_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    persist_document(&config_dir.join(CONFIG_YAML), &SentinelConfig::default())
        .await
        .unwrap();

    let operator = Uuid::new_v4();
    let mut host = OperatorHost::default();
    host.operators.insert(operator);
    let runtime = SentinelRuntime::init(
        RuntimeOptions::new(&config_dir)
            .with_watcher(false)
            .with_host(Arc::new(host)),
    )
    .await
    .unwrap();

    let context = runtime.on_subject_connect(operator, "Op");
    assert!(context.is_elevated());

    let permissions = runtime.permissions();
    assert!(permissions.authorized_in_context(&operator, "sentinelcore.logs"));
    assert!(!permissions.authorized_in_context(&operator, "sentinelcore.admin.dangerous.wipe"));
    assert!(runtime
        .admin()
        .may_administer(&Invoker::subject(operator, "Op"), AUDIT_TOGGLE_NODE));

    runtime.shutdown().await;
    assert!(runtime.contexts().is_empty());
}

#[tokio::test]
async fn unavailable_authority_falls_back_to_memory() {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    let mut config = SentinelConfig::default();
    config.permissions.backend = "bridge".to_string();
    persist_document(&config_dir.join(CONFIG_YAML), &config)
        .await
        .unwrap();

    let runtime = SentinelRuntime::init(
        RuntimeOptions::new(&config_dir)
            .with_watcher(false)
            .with_authority(Arc::new(OfflineAuthority)),
    )
    .await
    .unwrap();

    assert_eq!(runtime.registry().active_kind(), Some(BackendKind::Memory));
    assert_eq!(runtime.permissions().group(&Uuid::new_v4()), "default");
    runtime.shutdown().await;
}

#[tokio::test]
async fn watcher_applies_external_edits() {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    persist_document(&config_dir.join(CONFIG_YAML), &SentinelConfig::default())
        .await
        .unwrap();

    let runtime = SentinelRuntime::init(RuntimeOptions::new(&config_dir))
        .await
        .unwrap();
    let mut changes = runtime.store().subscribe();

    let mut edited = SentinelConfig::default();
    edited
        .permissions
        .roles
        .insert("builder".to_string(), RoleConfig::new(&["build.*"], &[], &[]));
    edited.feature_flags.insert("beta".to_string(), true);
    edited.audit.directory = "elsewhere".into();
    persist_document(&config_dir.join(CONFIG_YAML), &edited)
        .await
        .unwrap();
    runtime.store().request_reload();

    let snapshot = tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .expect("reload within timeout")
        .unwrap();
    assert!(snapshot.permissions.roles.contains_key("builder"));
    assert!(runtime.permissions().group_exists("builder"));
    assert!(runtime.flags().is_enabled("beta"));

    let expected = dir.path().join("elsewhere");
    let mut followed = false;
    for _ in 0..100 {
        if runtime.audit().directory() == expected {
            followed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(followed);

    runtime.shutdown().await;
    assert!(!runtime.store().watcher_running().await);
}
