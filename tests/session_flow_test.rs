mod common;

use anyhow::Result;
use std::time::Duration;
use tokio::time::sleep;

use common::{instance_record, Harness, ADMIN_TOKEN};
use gateway_console::controller::{RoleIndicator, ViewState};
use gateway_console::error::ConsoleError;
use gateway_console::poller::{PollSnapshot, PollerRole};
use gateway_console::StoreKey;

fn two_instances() -> Vec<gateway_console::models::Instance> {
    vec![
        instance_record("1", "tok-1", false, false),
        instance_record("2", "tok-2", true, true),
    ]
}

#[tokio::test(start_paused = true)]
async fn test_credentials_expire_after_ttl() -> Result<()> {
    let harness = Harness::new(two_instances());
    let mut controller = harness.controller();
    controller.login_regular("tok-1").await?;
    controller.shutdown();

    harness.clock.advance_hours(7);

    assert_eq!(harness.store.get_string(StoreKey::Token)?, None);
    assert!(harness.store.peek_entry(StoreKey::Token)?.is_none());

    let mut restored = harness.controller();
    assert_eq!(restored.restore().await?, ViewState::LoggedOut);
    assert_eq!(restored.active_poller(), None);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_admin_login_shows_overview() -> Result<()> {
    let harness = Harness::new(two_instances());
    let mut controller = harness.controller();

    let state = controller.login_admin(ADMIN_TOKEN).await?;

    assert_eq!(state, ViewState::AdminOverview);
    assert_eq!(controller.role(), RoleIndicator::Admin);
    assert_eq!(controller.instances().len(), 2);
    assert_eq!(controller.active_poller(), Some(PollerRole::Admin));
    assert_eq!(harness.store.get::<bool>(StoreKey::IsAdmin)?, Some(true));

    let view = controller.view()?;
    assert_eq!(view.rows.len(), 2);
    assert!(view.visible_card().is_none());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_regular_login_stores_instance_and_polls() -> Result<()> {
    let harness = Harness::new(two_instances());
    let mut controller = harness.controller();

    let state = controller.login_regular("tok-1").await?;

    assert_eq!(state, ViewState::RegularActive);
    assert_eq!(controller.role().label(), "USER");
    assert_eq!(harness.store.get_string(StoreKey::CurrentInstance)?.as_deref(), Some("1"));
    assert_eq!(controller.poll_interval_ms(), 5000);
    assert_eq!(controller.view()?.visible_card().map(|c| c.id.clone()), Some("1".to_string()));

    // Probe plus the poller's immediate fetch.
    sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.gateway.count("status"), 2);

    sleep(Duration::from_millis(5000)).await;
    assert_eq!(harness.gateway.count("status"), 3);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_connect_speeds_up_polling_until_logged_in() -> Result<()> {
    let harness = Harness::new(two_instances());
    let mut controller = harness.controller();
    controller.login_regular("tok-1").await?;
    sleep(Duration::from_millis(100)).await;
    let before = harness.gateway.count("status");

    controller.connect(None).await?;
    assert_eq!(controller.poll_interval_ms(), 1000);

    // Woken immediately, then every second.
    sleep(Duration::from_millis(2100)).await;
    assert_eq!(harness.gateway.count("status"), before + 3);
    assert_eq!(controller.poll_interval_ms(), 1000);

    harness.gateway.set_logged_in("tok-1", true);
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(controller.poll_interval_ms(), 5000);

    let after_reset = harness.gateway.count("status");
    sleep(Duration::from_millis(4000)).await;
    assert_eq!(harness.gateway.count("status"), after_reset);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_connect_failure_still_accelerates() -> Result<()> {
    let harness = Harness::new(two_instances());
    let mut controller = harness.controller();
    controller.login_regular("tok-1").await?;

    harness.gateway.set_offline(true);
    let result = controller.connect(None).await;

    assert!(matches!(result, Err(ConsoleError::NetworkError(_))));
    assert_eq!(controller.poll_interval_ms(), 1000);
    assert_eq!(controller.state(), ViewState::RegularActive);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_rejected_regular_token_is_cleared() -> Result<()> {
    let harness = Harness::new(two_instances());
    let mut controller = harness.controller();

    let result = controller.login_regular("wrong").await;

    assert!(matches!(result, Err(ConsoleError::AuthenticationError(_))));
    assert_eq!(controller.state(), ViewState::LoggedOut);
    assert_eq!(harness.store.get_string(StoreKey::Token)?, None);
    assert_eq!(controller.active_poller(), None);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_rejected_admin_token_is_cleared() -> Result<()> {
    let harness = Harness::new(two_instances());
    let mut controller = harness.controller();

    let result = controller.login_admin("not-admin").await;

    assert!(matches!(result, Err(ConsoleError::AuthenticationError(_))));
    assert_eq!(controller.state(), ViewState::LoggedOut);
    assert_eq!(harness.store.get_string(StoreKey::AdminToken)?, None);
    assert_eq!(harness.store.get::<bool>(StoreKey::IsAdmin)?, None);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_gateway_keeps_credentials() -> Result<()> {
    let harness = Harness::new(two_instances());
    harness.gateway.set_offline(true);
    let mut controller = harness.controller();

    let result = controller.login_regular("tok-1").await;

    assert!(matches!(result, Err(ConsoleError::NetworkError(_))));
    assert_eq!(controller.state(), ViewState::LoggedOut);
    assert_eq!(harness.store.get_string(StoreKey::Token)?.as_deref(), Some("tok-1"));

    harness.gateway.set_offline(false);
    let mut restored = harness.controller();
    assert_eq!(restored.restore().await?, ViewState::RegularActive);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_switching_roles_leaves_one_poller() -> Result<()> {
    let harness = Harness::new(two_instances());
    let mut controller = harness.controller();

    controller.login_regular("tok-1").await?;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(controller.active_poller(), Some(PollerRole::Regular));

    controller.login_admin(ADMIN_TOKEN).await?;
    assert_eq!(controller.active_poller(), Some(PollerRole::Admin));
    assert_eq!(harness.store.get_string(StoreKey::Token)?, None);

    let regular_polls = harness.gateway.count_with("status", "tok-1");
    let lists = harness.gateway.count("list_instances");

    sleep(Duration::from_millis(12_000)).await;

    assert_eq!(harness.gateway.count_with("status", "tok-1"), regular_polls);
    assert!(harness.gateway.count("list_instances") > lists);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_open_and_close_instance() -> Result<()> {
    let harness = Harness::new(two_instances());
    let mut controller = harness.controller();
    let mut updates = controller.take_updates().expect("updates");
    controller.login_admin(ADMIN_TOKEN).await?;

    let state = controller.open_instance("2", "tok-2")?;
    assert_eq!(state, ViewState::AdminInstanceOpen);
    assert_eq!(controller.role(), RoleIndicator::Admin);
    assert_eq!(harness.store.get_string(StoreKey::Token)?.as_deref(), Some("tok-2"));

    // The admin poller now follows the open instance.
    sleep(Duration::from_millis(5100)).await;
    assert!(harness.gateway.count_with("status", "tok-2") >= 1);

    let mut applied = false;
    while let Ok(snapshot) = updates.try_recv() {
        applied |= controller.apply_snapshot(snapshot);
    }
    assert!(applied);
    assert_eq!(controller.instances().len(), 1);
    assert_eq!(controller.view()?.visible_card().map(|c| c.id.clone()), Some("2".to_string()));

    let state = controller.close_instance()?;
    assert_eq!(state, ViewState::AdminOverview);
    assert_eq!(harness.store.get_string(StoreKey::CurrentInstance)?, None);
    assert_eq!(harness.store.get_string(StoreKey::Token)?, None);
    assert_eq!(controller.active_poller(), Some(PollerRole::Admin));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_open_instance_requires_admin_list() -> Result<()> {
    let harness = Harness::new(two_instances());
    let mut controller = harness.controller();
    controller.login_regular("tok-1").await?;

    let result = controller.open_instance("2", "tok-2");
    assert!(matches!(result, Err(ConsoleError::ValidationError(_))));
    assert_eq!(controller.state(), ViewState::RegularActive);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_restore_resumes_open_admin_instance() -> Result<()> {
    let harness = Harness::new(two_instances());
    {
        let mut controller = harness.controller();
        controller.login_admin(ADMIN_TOKEN).await?;
        controller.open_instance("1", "tok-1")?;
    }

    let mut restored = harness.controller();
    assert_eq!(restored.restore().await?, ViewState::AdminInstanceOpen);
    assert_eq!(restored.active_poller(), Some(PollerRole::Admin));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stale_snapshot_is_dropped() -> Result<()> {
    let harness = Harness::new(two_instances());
    let mut controller = harness.controller();
    controller.login_admin(ADMIN_TOKEN).await?;

    let stale = PollSnapshot {
        epoch: controller.epoch() - 1,
        role: PollerRole::Regular,
        instances: vec![instance_record("9", "tok-9", false, false)],
    };
    assert!(!controller.apply_snapshot(stale));
    assert_eq!(controller.instances().len(), 2);

    let fresh = PollSnapshot {
        epoch: controller.epoch(),
        role: PollerRole::Admin,
        instances: vec![],
    };
    assert!(controller.apply_snapshot(fresh));
    assert_eq!(controller.view()?.placeholder, Some("No instances found"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_logout_clears_everything() -> Result<()> {
    let harness = Harness::new(two_instances());
    let mut controller = harness.controller();
    controller.login_admin(ADMIN_TOKEN).await?;

    assert_eq!(controller.logout()?, ViewState::LoggedOut);
    assert_eq!(controller.role().label(), "");
    assert_eq!(controller.active_poller(), None);
    for key in StoreKey::ALL {
        assert!(!harness.store.contains(key)?);
    }

    let snapshot = PollSnapshot {
        epoch: controller.epoch(),
        role: PollerRole::Admin,
        instances: vec![instance_record("1", "tok-1", false, false)],
    };
    assert!(!controller.apply_snapshot(snapshot));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_pair_phone_connects_first() -> Result<()> {
    let harness = Harness::new(two_instances());
    let mut controller = harness.controller();
    controller.login_regular("tok-1").await?;

    assert!(matches!(
        controller.pair_phone("  ").await,
        Err(ConsoleError::ValidationError(_))
    ));

    let code = controller.pair_phone("5511999999999").await?;
    assert_eq!(code.linking_code, "ABCD-EFGH");
    assert_eq!(harness.gateway.count_with("connect", "tok-1"), 1);
    assert_eq!(harness.gateway.count_with("pair_phone", "tok-1"), 1);
    assert_eq!(controller.poll_interval_ms(), 1000);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_empty_token_is_rejected_locally() -> Result<()> {
    let harness = Harness::new(two_instances());
    let mut controller = harness.controller();

    let err = controller.login_regular("   ").await.unwrap_err();
    assert_eq!(err.user_message(), "Please enter your access token");
    assert_eq!(harness.gateway.count("status"), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_outage_skips_ticks_and_keeps_polling() -> Result<()> {
    let harness = Harness::new(two_instances());
    let mut controller = harness.controller();
    let mut updates = controller.take_updates().expect("updates");
    controller.login_regular("tok-1").await?;
    sleep(Duration::from_millis(100)).await;
    while let Ok(snapshot) = updates.try_recv() {
        controller.apply_snapshot(snapshot);
    }

    harness.gateway.set_offline(true);
    let before = harness.gateway.count("status");
    sleep(Duration::from_millis(15_000)).await;

    assert_eq!(harness.gateway.count("status"), before + 3);
    assert!(updates.try_recv().is_err());
    assert_eq!(controller.active_poller(), Some(PollerRole::Regular));
    assert_eq!(controller.state(), ViewState::RegularActive);
    assert_eq!(controller.poll_interval_ms(), 5000);

    harness.gateway.set_offline(false);
    harness.gateway.set_logged_in("tok-1", true);
    sleep(Duration::from_millis(5000)).await;

    assert_eq!(harness.gateway.count("status"), before + 4);
    let snapshot = updates.try_recv().expect("snapshot after recovery");
    assert!(controller.apply_snapshot(snapshot));
    assert!(controller.instances()[0].logged_in);
    Ok(())
}
