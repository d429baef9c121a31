//! Cached engine: snapshot refresh, ownership lookups, negative results.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockFleetClient, MockGroup, flexible, member_id, test_config, uniform, vm_id};
use fleetcache::types::{AGENT_POOL_NAME_TAG, AUTOSCALING_OPTIONS_TAG_PREFIX};
use fleetcache::{
    AgentPoolRecord, AgentPoolType, CachedResourceCache, FleetCacheError, ResourceCache,
    ResourceReference, VirtualMachineRecord, VmKind,
};

fn reference(id: &str) -> ResourceReference {
    ResourceReference::new(id)
}

#[tokio::test(start_paused = true)]
async fn regenerate_publishes_all_views() {
    let client = MockFleetClient::with_scale_sets(vec![uniform("pool-a"), flexible("pool-b")]);
    client.set_virtual_machines(vec![
        VirtualMachineRecord::new(vm_id("vm-0"), "vm-0").with_tag(AGENT_POOL_NAME_TAG, "pool-c"),
        VirtualMachineRecord::new(vm_id("vm-1"), "vm-1"),
    ]);
    let cache = CachedResourceCache::new(client.clone(), test_config());

    cache.regenerate().await.unwrap();

    assert_eq!(cache.scale_sets().await.len(), 2);
    let machines = cache.virtual_machines().await;
    assert_eq!(machines.len(), 1);
    assert_eq!(machines["pool-c"].len(), 1);
    assert!(cache.vms_pool_map().await.is_empty());
    assert_eq!(cache.snapshot().generation(), 1);
}

#[tokio::test(start_paused = true)]
async fn refresh_respects_ttl() {
    let client = MockFleetClient::new();
    let cache = CachedResourceCache::new(
        client.clone(),
        test_config().refresh_interval(Duration::from_secs(60)),
    );

    cache.regenerate().await.unwrap();
    assert_eq!(client.scale_set_call_count(), 1);

    tokio::time::advance(Duration::from_secs(30)).await;
    cache.regenerate().await.unwrap();
    assert_eq!(client.scale_set_call_count(), 1, "fresh at t=30");

    tokio::time::advance(Duration::from_secs(31)).await;
    cache.regenerate().await.unwrap();
    assert_eq!(client.scale_set_call_count(), 2, "stale at t=61");
}

#[tokio::test(start_paused = true)]
async fn invalidate_forces_next_refresh() {
    let client = MockFleetClient::new();
    let cache = CachedResourceCache::new(client.clone(), test_config());
    cache.regenerate().await.unwrap();

    cache.invalidate_cache();
    cache.regenerate().await.unwrap();
    assert_eq!(client.scale_set_call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_keeps_previous_snapshot() {
    let client = MockFleetClient::with_scale_sets(vec![uniform("pool-a")]);
    let cache = CachedResourceCache::new(client.clone(), test_config());
    cache.regenerate().await.unwrap();
    let before = cache.snapshot();
    let refreshed_at = cache.last_refresh();

    tokio::time::advance(Duration::from_secs(61)).await;
    client.set_scale_sets(vec![uniform("pool-a"), uniform("pool-b")]);
    client.set_failing(true);

    let err = cache.regenerate().await.unwrap_err();
    assert!(err.is_remote_failure());
    assert!(Arc::ptr_eq(&before, &cache.snapshot()));
    assert_eq!(cache.last_refresh(), refreshed_at);
    assert_eq!(cache.scale_sets().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn group_listing_failure_fails_refresh() {
    let client = MockFleetClient::with_scale_sets(vec![uniform("pool-a")]);
    let cache = CachedResourceCache::new(client, test_config());
    let group = Arc::new(MockGroup::new("pool-a", 0, 3));
    group.set_failing(true);
    cache.register(group);

    let err = cache.regenerate().await.unwrap_err();
    assert!(matches!(err, FleetCacheError::GroupListing { ref group, .. } if group == "pool-a"));
    assert_eq!(cache.snapshot().generation(), 0);
    assert!(cache.last_refresh().is_none());
}

#[tokio::test(start_paused = true)]
async fn concurrent_regenerate_fetches_once() {
    let client = MockFleetClient::new();
    client.set_delay(Duration::from_millis(500));
    let cache = Arc::new(CachedResourceCache::new(client.clone(), test_config()));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.regenerate().await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(client.scale_set_call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn finds_owner_case_insensitively() {
    let client = MockFleetClient::with_scale_sets(vec![uniform("pool-a")]);
    let cache = CachedResourceCache::new(client, test_config());
    let member = member_id("pool-a", 3);
    cache.register(Arc::new(
        MockGroup::new("pool-a", 0, 5).with_members(&[member.to_lowercase()]),
    ));
    cache.regenerate().await.unwrap();

    let owner = cache
        .find_for_instance(&reference(&member.to_uppercase()), VmKind::ScaleSetBacked)
        .await
        .unwrap()
        .expect("owned instance");
    assert_eq!(owner.id(), "pool-a");
}

#[tokio::test(start_paused = true)]
async fn finds_owner_from_provider_id() {
    let client = MockFleetClient::with_scale_sets(vec![uniform("pool-a")]);
    let cache = CachedResourceCache::new(client, test_config());
    let member = member_id("pool-a", 0);
    cache.register(Arc::new(MockGroup::new("pool-a", 0, 5).with_members(&[member.clone()])));
    cache.regenerate().await.unwrap();

    let provider_id = format!("azure://{member}");
    let owner = cache
        .find_for_instance(
            &ResourceReference::from_provider_id(&provider_id),
            VmKind::ScaleSetBacked,
        )
        .await
        .unwrap();
    assert!(owner.is_some());
    assert!(cache.has_instance(&provider_id).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn member_added_after_refresh_is_found_by_scan() {
    let client = MockFleetClient::with_scale_sets(vec![uniform("pool-a")]);
    let cache = CachedResourceCache::new(client, test_config());
    let group = Arc::new(MockGroup::new("pool-a", 0, 5));
    cache.register(group.clone());
    cache.regenerate().await.unwrap();

    let member = member_id("pool-a", 7);
    group.set_members(&[member.clone()]);

    let owner = cache
        .find_for_instance(&reference(&member), VmKind::ScaleSetBacked)
        .await
        .unwrap();
    assert_eq!(owner.map(|g| g.id().to_string()).as_deref(), Some("pool-a"));
}

#[tokio::test(start_paused = true)]
async fn standalone_vm_without_owner_is_none() {
    let cache = CachedResourceCache::new(MockFleetClient::new(), test_config());
    cache.register(Arc::new(MockGroup::new("pool-a", 0, 5)));
    cache.regenerate().await.unwrap();

    let owner = cache
        .find_for_instance(&reference(&vm_id("stray")), VmKind::Standalone)
        .await
        .unwrap();
    assert!(owner.is_none());
}

#[tokio::test(start_paused = true)]
async fn standalone_lookup_skips_scale_set_members() {
    let cache = CachedResourceCache::new(MockFleetClient::new(), test_config());
    let group = Arc::new(MockGroup::new("pool-a", 0, 5));
    cache.register(group.clone());
    cache.regenerate().await.unwrap();
    let calls = group.node_call_count();

    let owner = cache
        .find_for_instance(&reference(&member_id("pool-a", 0)), VmKind::Standalone)
        .await
        .unwrap();
    assert!(owner.is_none());
    assert_eq!(group.node_call_count(), calls);
}

#[tokio::test(start_paused = true)]
async fn miss_is_remembered_until_next_refresh() {
    let cache = CachedResourceCache::new(MockFleetClient::new(), test_config());
    let group = Arc::new(MockGroup::new("pool-a", 0, 5).with_members(&[vm_id("vm-0")]));
    cache.register(group.clone());
    cache.regenerate().await.unwrap();
    assert_eq!(group.node_call_count(), 1, "index rebuild");

    let stray = reference(&vm_id("stray"));
    assert!(cache.find_for_instance(&stray, VmKind::Standalone).await.unwrap().is_none());
    assert_eq!(group.node_call_count(), 2, "first miss scans");
    assert_eq!(cache.unowned_count(), 1);

    assert!(cache.find_for_instance(&stray, VmKind::Standalone).await.unwrap().is_none());
    assert_eq!(group.node_call_count(), 2, "second miss is memoized");

    cache.invalidate_cache();
    cache.regenerate().await.unwrap();
    assert_eq!(cache.unowned_count(), 0);
    assert_eq!(group.node_call_count(), 3);

    assert!(cache.find_for_instance(&stray, VmKind::Standalone).await.unwrap().is_none());
    assert_eq!(group.node_call_count(), 4, "refresh cleared the memo");
}

#[tokio::test(start_paused = true)]
async fn miss_racing_a_registration_is_not_remembered() {
    let cache = CachedResourceCache::new(MockFleetClient::new(), test_config());
    let slow = Arc::new(MockGroup::new("slow", 0, 5));
    slow.set_delay(Duration::from_secs(1));
    cache.register(slow);
    cache.regenerate().await.unwrap();

    let vm = reference(&vm_id("vm-x"));
    let owner = Arc::new(MockGroup::new("owner", 0, 5).with_members(&[vm_id("vm-x")]));
    let register = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(cache.register(owner.clone()));
    };
    let (first, ()) = tokio::join!(cache.find_for_instance(&vm, VmKind::Standalone), register);
    assert!(first.unwrap().is_none(), "scan started before the owner existed");
    assert_eq!(cache.unowned_count(), 0);

    let found = cache
        .find_for_instance(&vm, VmKind::Standalone)
        .await
        .unwrap()
        .map(|group| group.id().to_string());
    assert_eq!(found.as_deref(), Some("owner"));
}

#[tokio::test(start_paused = true)]
async fn uniform_scale_sets_skip_standalone_vm() {
    let client = MockFleetClient::with_scale_sets(vec![uniform("a"), uniform("b")]);
    let cache = CachedResourceCache::new(client, test_config());
    let vm = vm_id("vm-0");
    let group = Arc::new(MockGroup::new("a", 0, 5));
    cache.register(group.clone());
    cache.regenerate().await.unwrap();
    group.set_members(&[vm.clone()]);
    let calls = group.node_call_count();

    let owner = cache
        .find_for_instance(&reference(&vm), VmKind::ScaleSetBacked)
        .await
        .unwrap();
    assert!(owner.is_none());
    assert_eq!(group.node_call_count(), calls, "no group was searched");
}

#[tokio::test(start_paused = true)]
async fn flexible_scale_set_falls_through_to_group_search() {
    let client = MockFleetClient::with_scale_sets(vec![uniform("a"), flexible("b")]);
    let cache = CachedResourceCache::new(client, test_config());
    let vm = vm_id("vm-0");
    let group = Arc::new(MockGroup::new("b", 0, 5));
    cache.register(group.clone());
    cache.regenerate().await.unwrap();
    group.set_members(&[vm.clone()]);

    let owner = cache
        .find_for_instance(&reference(&vm), VmKind::ScaleSetBacked)
        .await
        .unwrap();
    assert_eq!(owner.map(|g| g.id().to_string()).as_deref(), Some("b"));
}

#[tokio::test(start_paused = true)]
async fn agent_pools_disable_uniform_shortcut() {
    let client = MockFleetClient::with_scale_sets(vec![uniform("a")]);
    client.set_agent_pool_pages(vec![vec![AgentPoolRecord::new(
        "vmpool",
        AgentPoolType::VirtualMachines,
    )]]);
    let config = test_config()
        .enable_vms_agent_pool(true)
        .cluster("rg-cluster", "prod");
    let cache = CachedResourceCache::new(client, config);
    let vm = vm_id("vm-0");
    cache.register(Arc::new(MockGroup::new("vmpool", 0, 5).with_members(&[vm.clone()])));
    cache.regenerate().await.unwrap();

    let owner = cache
        .find_for_instance(&reference(&vm), VmKind::ScaleSetBacked)
        .await
        .unwrap();
    assert!(owner.is_some());
}

#[tokio::test(start_paused = true)]
async fn agent_pools_are_paged_and_filtered() {
    let client = MockFleetClient::new();
    client.set_agent_pool_pages(vec![
        vec![
            AgentPoolRecord::new("vmss", AgentPoolType::VirtualMachineScaleSets),
            AgentPoolRecord::new("vms-1", AgentPoolType::VirtualMachines),
        ],
        vec![AgentPoolRecord::new("vms-2", AgentPoolType::VirtualMachines)],
    ]);
    let config = test_config()
        .enable_vms_agent_pool(true)
        .cluster("rg-cluster", "prod");
    let cache = CachedResourceCache::new(client.clone(), config);
    cache.regenerate().await.unwrap();

    let pools = cache.vms_pool_map().await;
    assert_eq!(pools.len(), 2);
    assert!(pools.contains_key("vms-1") && pools.contains_key("vms-2"));
}

#[tokio::test(start_paused = true)]
async fn failed_pool_page_fails_refresh() {
    let client = MockFleetClient::new();
    client.set_agent_pool_pages(vec![
        vec![AgentPoolRecord::new("vms-1", AgentPoolType::VirtualMachines)],
        vec![AgentPoolRecord::new("vms-2", AgentPoolType::VirtualMachines)],
    ]);
    client.fail_pool_page(1);
    let config = test_config()
        .enable_vms_agent_pool(true)
        .cluster("rg-cluster", "prod");
    let cache = CachedResourceCache::new(client, config);

    assert!(cache.regenerate().await.is_err());
    assert!(cache.vms_pool_map().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn agent_pools_skipped_when_client_lacks_support() {
    let client = MockFleetClient::new();
    client.disable_agent_pools();
    let config = test_config()
        .enable_vms_agent_pool(true)
        .cluster("rg-cluster", "prod");
    let cache = CachedResourceCache::new(client.clone(), config);
    cache.regenerate().await.unwrap();

    assert_eq!(
        client.agent_pool_calls.load(std::sync::atomic::Ordering::SeqCst),
        0
    );
}

#[tokio::test(start_paused = true)]
async fn has_instance_answers_from_index() {
    let cache = CachedResourceCache::new(MockFleetClient::new(), test_config());
    let vm = vm_id("vm-0");
    cache.register(Arc::new(MockGroup::new("pool-a", 0, 5).with_members(&[vm.clone()])));
    cache.regenerate().await.unwrap();

    assert!(cache.has_instance(&vm).await.unwrap());
    assert!(!cache.has_instance(&vm_id("vm-9")).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn invalid_reference_is_rejected() {
    let cache = CachedResourceCache::new(MockFleetClient::new(), test_config());
    let result = cache
        .find_for_instance(&reference("kind://node-1"), VmKind::Standalone)
        .await;
    assert!(matches!(result, Err(FleetCacheError::InvalidReference { .. })));
    assert!(cache.has_instance("not-a-path").await.is_err());
}

#[tokio::test(start_paused = true)]
async fn autoscaling_options_from_scale_set_tags() {
    let client = MockFleetClient::with_scale_sets(vec![
        uniform("pool-a").with_tag(format!("{AUTOSCALING_OPTIONS_TAG_PREFIX}expander"), "Random"),
    ]);
    let cache = CachedResourceCache::new(client, test_config());
    cache.regenerate().await.unwrap();

    let options = cache.autoscaling_options(&reference("pool-a")).await;
    assert_eq!(options["expander"], "random");
    assert!(cache.autoscaling_options(&reference("pool-z")).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn cleanup_drops_snapshot() {
    let client = MockFleetClient::with_scale_sets(vec![uniform("pool-a")]);
    let cache = CachedResourceCache::new(client.clone(), test_config());
    cache.regenerate().await.unwrap();

    cache.cleanup();
    assert!(cache.scale_sets().await.is_empty());
    assert!(cache.last_refresh().is_none());

    cache.regenerate().await.unwrap();
    assert_eq!(client.scale_set_call_count(), 2);
}
