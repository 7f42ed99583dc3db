//! Shared scaffolding for the workspace-level behavioral specs.
//!
//! The control plane is a long-running daemon, not a CLI, so these specs
//! are black-box only with respect to the public library surface: they
//! wire up a real `Repository` against a scratch WAL file plus
//! `FakeAgentClient` doubles for every host, then drive `JobRunner`,
//! `LinkManager`, and friends exactly the way `netlabd`'s main loop does.
//! Nothing here reaches into crate-private state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use netlab_adapters::{FakeAgentClient, RuntimeRouter};
use netlab_core::{
    Clock, FakeClock, HostId, LabId, LabProvider, Link, LinkEndpoint, LinkId, NodeDesiredState,
    NodeId, NodeKind,
};
use netlab_engine::{JobRunner, LinkManager, LinkReconciler, LinkReservations, NodeReconciler};
use netlab_storage::{Event, Repository};
use tempfile::TempDir;

/// Owns the scratch directory so the WAL file outlives the test.
pub struct Harness {
    pub _dir: TempDir,
    pub repo: Arc<Repository>,
    pub router: Arc<RuntimeRouter>,
    pub reservations: Arc<LinkReservations>,
    pub link_manager: Arc<LinkManager<FakeClock>>,
    pub link_reconciler: Arc<LinkReconciler<FakeClock>>,
    pub node_reconciler: Arc<NodeReconciler<FakeClock>>,
    pub jobs: Arc<JobRunner<FakeClock>>,
    fakes: Mutex<HashMap<HostId, Arc<FakeAgentClient>>>,
}

impl Harness {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = Arc::new(Repository::open(dir.path().join("wal.jsonl"), 0).expect("open wal"));
        let router = Arc::new(RuntimeRouter::new());
        let reservations = Arc::new(LinkReservations::new(repo.clone(), LinkReservations::default_normaliser()));
        let link_manager =
            Arc::new(LinkManager::new(repo.clone(), router.clone(), reservations.clone(), FakeClock::new()));
        let link_reconciler = Arc::new(LinkReconciler::new(repo.clone(), router.clone(), link_manager.clone()));
        let node_reconciler = Arc::new(NodeReconciler::new(repo.clone(), router.clone(), FakeClock::new()));
        let jobs = Arc::new(JobRunner::new(
            repo.clone(),
            router.clone(),
            netlab_engine::Broadcaster::new(),
            link_manager.clone(),
            link_reconciler.clone(),
            node_reconciler.clone(),
            reservations.clone(),
            FakeClock::new(),
        ));
        Self {
            _dir: dir,
            repo,
            router,
            reservations,
            link_manager,
            link_reconciler,
            node_reconciler,
            jobs,
            fakes: Mutex::new(HashMap::new()),
        }
    }

    pub async fn create_lab(&self, name: &str, owner: &str) -> LabId {
        let lab_id = LabId::new();
        self.repo
            .apply(Event::LabCreated {
                lab_id,
                name: name.to_string(),
                owner: owner.to_string(),
                provider: LabProvider::Docker,
                workspace_path: format!("/var/lib/netlab/{name}"),
            })
            .await
            .expect("lab created");
        lab_id
    }

    pub async fn register_host(&self, address: &str) -> HostId {
        let host_id = HostId::new();
        self.repo
            .apply(Event::HostRegistered {
                host_id,
                address: address.to_string(),
                capabilities: serde_json::Value::Null,
                image_sync_strategy: "pull".to_string(),
            })
            .await
            .expect("host registered");
        let client = Arc::new(FakeAgentClient::new(host_id));
        self.router.register(host_id, client.clone());
        self.fakes.lock().expect("fakes lock").insert(host_id, client);
        host_id
    }

    pub fn fake(&self, host_id: HostId) -> Arc<FakeAgentClient> {
        self.fakes
            .lock()
            .expect("fakes lock")
            .get(&host_id)
            .cloned()
            .unwrap_or_else(|| panic!("no fake agent registered for {host_id}"))
    }

    pub async fn declare_node(&self, lab_id: LabId, name: &str, host_id: HostId) -> NodeId {
        let node_id = NodeId::new();
        self.repo
            .apply(Event::NodeDeclared {
                lab_id,
                node_id,
                display_name: name.to_string(),
                container_name: format!("clab-{name}"),
                kind: NodeKind::Linux,
                image_ref: "alpine:3".to_string(),
            })
            .await
            .expect("node declared");
        self.repo.apply(Event::PlacementSet { lab_id, node_id, host_id }).await.expect("placement set");
        self.repo
            .apply(Event::NodeDesiredStateSet { lab_id, node_id, desired_state: NodeDesiredState::Running })
            .await
            .expect("desired state set");
        node_id
    }

    pub async fn declare_link(
        &self,
        lab_id: LabId,
        link_name: &str,
        source: (NodeId, &str, &str),
        target: (NodeId, &str, &str),
    ) -> Link {
        let link = Link {
            id: LinkId::new(),
            lab_id,
            link_name: link_name.to_string(),
            source: LinkEndpoint { node_id: source.0, node_name: source.1.to_string(), interface: source.2.to_string() },
            target: LinkEndpoint { node_id: target.0, node_name: target.1.to_string(), interface: target.2.to_string() },
            mtu: None,
        };
        self.repo
            .apply(Event::LinkDeclared {
                lab_id,
                link_id: link.id,
                link_name: link.link_name.clone(),
                source: link.source.clone(),
                target: link.target.clone(),
                mtu: link.mtu,
            })
            .await
            .expect("link declared");
        self.repo
            .apply(Event::LinkStateCreated {
                lab_id,
                link_state_id: netlab_core::LinkStateId::new(),
                link_definition_id: Some(link.id),
                link_name: link.link_name.clone(),
                source: link.source.clone(),
                target: link.target.clone(),
            })
            .await
            .expect("link state created");
        link
    }

    /// Submits `action` as `user` and runs it to completion, returning the
    /// terminal outcome.
    pub async fn run(&self, lab_id: LabId, user: &str, action: netlab_core::JobAction) -> netlab_engine::job_runner::JobRunOutcome {
        let job_id = self.jobs.submit(lab_id, user, action).await.expect("job submitted");
        self.jobs.run_job(job_id).await.expect("job ran")
    }
}

pub fn epoch_ms() -> u64 {
    FakeClock::new().epoch_ms()
}
