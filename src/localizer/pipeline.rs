//! Localizer - asynchronous scan-to-local-map registration.
//!
//! Producers call [`Localizer::add_new_data`] from any thread. A single
//! worker drains the queue in order and runs one cycle per observation:
//!
//! 1. filter the raw cloud and move it into the robot frame
//! 2. bootstrap the graph with the first scan, or refresh the window when
//!    the manager reports a change
//! 3. register the scan against the window, in the reference keyframe frame
//! 4. report the corrected pose and overlap back to the manager
//! 5. publish a [`LocalizationResult`] to every subscriber
//!
//! The pipeline state lives in a `PipelineCore` shared with the façade
//! through a mutex. The worker holds it for a whole cycle, so getters never
//! observe a half-rebuilt window.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::cloud::{FilterChain, PointCloud};
use crate::error::{LocalizerError, MapError, Result};
use crate::geometry::SE3;
use crate::local_map::{Composition, DataBuffer, LocalMap};
use crate::mapping::MapManager;
use crate::registration::{IcpConfig, IcpSequence, RegistrationEngine};

use super::config::LocalizerConfig;
use super::observation::Observation;
use super::policy::{CompositionPolicy, PreferNewComposition};
use super::queue::IngestionQueue;
use super::result::{LocalizationResult, LocalizerStats, TimingStats};
use super::state::LocalizerState;
use super::worker::WorkerTask;

const WORKER_NAME: &str = "localizer";

struct PipelineCore {
    config: LocalizerConfig,
    manager: Arc<dyn MapManager>,
    engine: Box<dyn RegistrationEngine>,
    filters: FilterChain,
    policy: Box<dyn CompositionPolicy>,
    local_map: LocalMap,
    state: LocalizerState,
    stats: LocalizerStats,
    latest: Option<LocalizationResult>,
    subscribers: Vec<Sender<LocalizationResult>>,
}

impl PipelineCore {
    fn process(&mut self, observation: Observation) {
        self.stats.processed += 1;
        let timestamp_ns = observation.timestamp_ns;
        if let Err(e) = self.run_cycle(observation) {
            self.stats.failed_registrations += 1;
            error!("Localization failed for scan {}: {}", timestamp_ns, e);
        }
    }

    fn run_cycle(&mut self, observation: Observation) -> Result<()> {
        let Observation {
            timestamp_ns,
            frame_id,
            t_world_robot,
            t_robot_sensor,
            cloud: mut raw,
        } = observation;
        let mut timing = TimingStats::default();
        let start = Instant::now();

        // Input filters work in sensor frame
        self.filters.apply(&mut raw);
        let cloud = self
            .manager
            .rigid_transformation()
            .compute(&raw, &t_robot_sensor);
        timing.filter_ms = start.elapsed().as_secs_f64() * 1000.0;
        debug!("Input filters took {:.2} ms, {} points kept", timing.filter_ms, cloud.len());

        match self.state {
            LocalizerState::Uninitialized => {
                return self.bootstrap(timestamp_ns, cloud, t_world_robot);
            }
            LocalizerState::Tracking => {}
            LocalizerState::Stopped => return Ok(()),
        }

        let t0 = Instant::now();
        if self.manager.local_map_needs_update() {
            self.refresh_local_map()?;
        }
        timing.map_update_ms = t0.elapsed().as_secs_f64() * 1000.0;

        let (reference_vertex, t_world_refkf) = match (
            self.local_map.reference_vertex(),
            self.local_map.reference_keyframe(),
        ) {
            (Some(v), Some(kf)) => (v, kf.optimized_t_world_kf),
            _ => return Err(MapError::EmptyWindow.into()),
        };

        let t0 = Instant::now();
        let initial_guess = t_world_refkf.inverse().compose(&t_world_robot);
        let t_refkf_robot = self.engine.register(&cloud, &initial_guess)?;
        let pose = t_world_refkf.compose(&t_refkf_robot);
        let overlap = self.engine.last_overlap();
        timing.registration_ms = t0.elapsed().as_secs_f64() * 1000.0;
        debug!(
            "Registration took {:.2} ms, overlap {:.3}",
            timing.registration_ms, overlap
        );

        if !self.has_enough_overlap(overlap) {
            self.stats.low_overlap += 1;
        }

        let new_keyframe = self
            .manager
            .add_keyframe_based_on_overlap(overlap, timestamp_ns, cloud, pose)?;
        if new_keyframe.is_some() {
            self.stats.keyframes_added += 1;
        }

        timing.total_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.publish(LocalizationResult {
            timestamp_ns,
            frame_id,
            pose,
            overlap,
            reference_vertex,
            new_keyframe,
            timing,
        });
        Ok(())
    }

    /// Seed the graph with the first usable scan. An empty scan is skipped
    /// and the next one gets to bootstrap.
    fn bootstrap(
        &mut self,
        timestamp_ns: u64,
        cloud: PointCloud,
        t_world_robot: SE3,
    ) -> Result<()> {
        if cloud.is_empty() {
            warn!(
                "Scan {} is empty after filtering, not usable as first keyframe",
                timestamp_ns
            );
            return Ok(());
        }

        let v = self
            .manager
            .add_first_keyframe(timestamp_ns, cloud, t_world_robot)?;
        let buffer = self.manager.updated_local_map()?;
        self.load_window(buffer);
        if !self.engine.has_map() {
            warn!("Local map from keyframe {} has no points, still uninitialized", v);
            return Ok(());
        }
        self.state = LocalizerState::Tracking;
        info!("Localizer initialized on keyframe {}", v);
        Ok(())
    }

    /// Pull the manager's window and load it when it is worth a rebuild.
    fn refresh_local_map(&mut self) -> Result<bool, MapError> {
        let buffer = self.manager.updated_local_map()?;
        let candidate = buffer.composition();

        if !self.is_better_composition(&candidate) && !self.has_newer_snapshots(&buffer) {
            debug!("Keeping current local map, candidate is not better");
            return Ok(false);
        }

        self.load_window(buffer);
        Ok(true)
    }

    fn load_window(&mut self, buffer: DataBuffer) {
        let t0 = Instant::now();
        self.local_map.update_from_data_buffer(buffer);
        self.stats.local_map_rebuilds += 1;
        if !self.local_map.has_cloud() {
            warn!("Local map has no points, registration engine keeps its previous map");
            return;
        }
        self.engine.set_map(self.local_map.cloud());
        debug!(
            "Setting new map took {:.2} ms ({} keyframes, {} points)",
            t0.elapsed().as_secs_f64() * 1000.0,
            self.local_map.len(),
            self.local_map.cloud().len()
        );
    }

    fn has_enough_overlap(&self, overlap: f64) -> bool {
        let enough = overlap >= self.config.overlap_range.min;
        if !enough {
            warn!(
                "Overlap {:.3} is below {:.3}, registration may be unreliable",
                overlap, self.config.overlap_range.min
            );
        }
        enough
    }

    fn is_better_composition(&self, candidate: &Composition) -> bool {
        let latest_pose = self.latest.as_ref().map(|r| &r.pose);
        self.policy.is_better(&self.local_map, candidate, latest_pose)
    }

    /// A shared member was re-optimized since the window snapshot.
    fn has_newer_snapshots(&self, buffer: &DataBuffer) -> bool {
        buffer.iter().any(|candidate| {
            self.local_map
                .data()
                .iter()
                .find(|e| e.vertex == candidate.vertex)
                .is_some_and(|e| candidate.keyframe.update_time > e.keyframe.update_time)
        })
    }

    fn publish(&mut self, result: LocalizationResult) {
        self.subscribers.retain(|tx| tx.send(result.clone()).is_ok());
        self.stats.published += 1;
        self.latest = Some(result);
    }
}

fn worker_loop(core: Arc<Mutex<PipelineCore>>, queue: Arc<IngestionQueue<Observation>>) {
    info!("Localizer worker started");
    while let Some(observation) = queue.pop_or_wait() {
        core.lock().process(observation);
    }
    info!("Localizer worker stopped");
}

/// Front-end registering incoming scans against a local map window.
pub struct Localizer {
    config: LocalizerConfig,
    core: Arc<Mutex<PipelineCore>>,
    queue: Arc<IngestionQueue<Observation>>,
    worker: Mutex<Option<WorkerTask>>,
}

impl Localizer {
    pub fn new(manager: Arc<dyn MapManager>, config: LocalizerConfig) -> Self {
        let core = PipelineCore {
            config: config.clone(),
            manager,
            engine: Box::new(IcpSequence::default()),
            filters: FilterChain::new(),
            policy: Box::new(PreferNewComposition),
            local_map: LocalMap::new(config.local_map_capacity),
            state: LocalizerState::Uninitialized,
            stats: LocalizerStats::default(),
            latest: None,
            subscribers: Vec::new(),
        };
        Self {
            config,
            core: Arc::new(Mutex::new(core)),
            queue: Arc::new(IngestionQueue::new()),
            worker: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &LocalizerConfig {
        &self.config
    }

    /// Replace the registration engine by an ICP configured from YAML.
    pub fn set_local_icp_config<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let config = IcpConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load local ICP config {:?}", path))?;
        self.set_engine(Box::new(IcpSequence::new(config)));
        Ok(())
    }

    /// Replace the input filter chain by one configured from YAML.
    pub fn set_input_filters_config<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let filters = FilterChain::from_yaml_file(path)
            .with_context(|| format!("Failed to load input filters {:?}", path))?;
        info!("Input filters: {:?}", filters.names());
        self.set_filters(filters);
        Ok(())
    }

    /// The new engine is seeded with the current window, if any.
    pub fn set_engine(&self, mut engine: Box<dyn RegistrationEngine>) {
        let mut core = self.core.lock();
        if core.local_map.has_cloud() {
            engine.set_map(core.local_map.cloud());
        }
        core.engine = engine;
    }

    pub fn set_filters(&self, filters: FilterChain) {
        self.core.lock().filters = filters;
    }

    pub fn set_policy(&self, policy: Box<dyn CompositionPolicy>) {
        let mut core = self.core.lock();
        debug!("Composition policy set to {}", policy.name());
        core.policy = policy;
    }

    /// Queue an observation. Never blocks on the worker.
    pub fn add_new_data(&self, observation: Observation) {
        let backlog = self.queue.push(observation);
        if backlog > self.config.backlog_warning {
            warn!(
                "Localizer is falling behind: {} scans waiting",
                backlog
            );
        }
    }

    /// Start the worker thread.
    pub fn run(&self) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Err(LocalizerError::AlreadyRunning);
        }

        {
            let mut core = self.core.lock();
            if core.state == LocalizerState::Stopped {
                core.state = if core.local_map.is_empty() {
                    LocalizerState::Uninitialized
                } else {
                    LocalizerState::Tracking
                };
            }
        }

        self.queue.reset();
        let core = Arc::clone(&self.core);
        let queue = Arc::clone(&self.queue);
        *worker = Some(WorkerTask::spawn(WORKER_NAME, move || worker_loop(core, queue))?);
        Ok(())
    }

    /// Stop the worker and wait for it. Scans still queued are not processed.
    pub fn stop(&self) {
        self.queue.request_stop();
        if let Some(mut task) = self.worker.lock().take() {
            task.join();
            self.core.lock().state = LocalizerState::Stopped;
            info!("Localizer stopped, {} scans left in queue", self.queue.len());
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Merged window cloud in the reference keyframe frame, and whether
    /// there is one.
    pub fn get_local_map(&self) -> (PointCloud, bool) {
        let core = self.core.lock();
        (core.local_map.cloud().clone(), core.local_map.has_cloud())
    }

    pub fn get_local_map_in_world_frame(&self) -> (PointCloud, bool) {
        let core = self.core.lock();
        (core.local_map.cloud_in_world_frame(), core.local_map.has_cloud())
    }

    pub fn state(&self) -> LocalizerState {
        self.core.lock().state
    }

    pub fn stats(&self) -> LocalizerStats {
        self.core.lock().stats
    }

    pub fn latest_pose(&self) -> Option<SE3> {
        self.core.lock().latest.as_ref().map(|r| r.pose)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Receive every result published from now on.
    pub fn subscribe(&self) -> Receiver<LocalizationResult> {
        let (tx, rx) = unbounded();
        self.core.lock().subscribers.push(tx);
        rx
    }
}

impl Drop for Localizer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistrationError;
    use crate::mapping::{SlidingWindowConfig, SlidingWindowMapManager};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::io::Write;
    use std::thread;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + TIMEOUT;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn room_cloud(seed: u64) -> PointCloud {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut points = Vec::new();
        for _ in 0..200 {
            let a = rng.gen_range(-2.0..2.0);
            let b = rng.gen_range(-2.0..2.0);
            points.push(Vector3::new(a, b, rng.gen_range(-0.01..0.01)));
            points.push(Vector3::new(a, rng.gen_range(-0.01..0.01) + 2.0, b));
            points.push(Vector3::new(rng.gen_range(-0.01..0.01) + 2.0, a, b));
        }
        PointCloud::from_points(points)
    }

    fn observation(timestamp_ns: u64, t_world_robot: SE3, cloud: PointCloud) -> Observation {
        Observation::new(timestamp_ns, "world", t_world_robot, SE3::identity(), cloud)
    }

    fn manager(capacity: usize, threshold: f64) -> Arc<SlidingWindowMapManager> {
        Arc::new(SlidingWindowMapManager::new(SlidingWindowConfig {
            window_capacity: capacity,
            keyframe_overlap_threshold: threshold,
        }))
    }

    /// Returns the initial guess unchanged with a fixed overlap.
    struct PassThroughEngine {
        has_map: bool,
        overlap: f64,
    }

    impl RegistrationEngine for PassThroughEngine {
        fn has_map(&self) -> bool {
            self.has_map
        }

        fn set_map(&mut self, map: &PointCloud) {
            self.has_map = !map.is_empty();
        }

        fn register(
            &mut self,
            _reading: &PointCloud,
            initial_guess: &SE3,
        ) -> Result<SE3, RegistrationError> {
            if !self.has_map {
                return Err(RegistrationError::NoMap);
            }
            Ok(*initial_guess)
        }

        fn last_overlap(&self) -> f64 {
            self.overlap
        }
    }

    struct FailingEngine;

    impl RegistrationEngine for FailingEngine {
        fn has_map(&self) -> bool {
            true
        }

        fn set_map(&mut self, _map: &PointCloud) {}

        fn register(
            &mut self,
            _reading: &PointCloud,
            _initial_guess: &SE3,
        ) -> Result<SE3, RegistrationError> {
            Err(RegistrationError::NotEnoughCorrespondences { found: 0, required: 10 })
        }

        fn last_overlap(&self) -> f64 {
            0.0
        }
    }

    #[test]
    fn test_shutdown_without_start() {
        let localizer = Localizer::new(manager(3, 0.8), LocalizerConfig::default());
        localizer.stop();
        localizer.stop();
        assert_eq!(localizer.state(), LocalizerState::Uninitialized);
        assert_eq!(localizer.get_local_map(), (PointCloud::new(), false));
    }

    #[test]
    fn test_shutdown_without_data() {
        let localizer = Localizer::new(manager(3, 0.8), LocalizerConfig::default());
        localizer.run().unwrap();
        assert!(localizer.is_running());
        localizer.stop();
        assert!(!localizer.is_running());
        assert_eq!(localizer.state(), LocalizerState::Stopped);
    }

    #[test]
    fn test_run_twice_fails() {
        let localizer = Localizer::new(manager(3, 0.8), LocalizerConfig::default());
        localizer.run().unwrap();
        assert!(matches!(localizer.run(), Err(LocalizerError::AlreadyRunning)));
        localizer.stop();
        localizer.run().unwrap();
    }

    #[test]
    fn test_first_scan_bootstraps_without_result() {
        let m = manager(3, 0.8);
        let localizer = Localizer::new(m.clone(), LocalizerConfig::default());
        let results = localizer.subscribe();
        localizer.run().unwrap();

        let t_world_robot = SE3::from_translation(Vector3::new(1.0, 0.0, 0.0));
        localizer.add_new_data(observation(1, t_world_robot, room_cloud(1)));

        assert!(wait_until(|| localizer.state() == LocalizerState::Tracking));
        assert!(results.try_recv().is_err());
        assert_eq!(m.num_keyframes(), 1);

        let (local, has_cloud) = localizer.get_local_map();
        assert!(has_cloud);
        assert_eq!(local.len(), room_cloud(1).len());

        let (world, _) = localizer.get_local_map_in_world_frame();
        assert_relative_eq!(
            world.points[0],
            local.points[0] + Vector3::new(1.0, 0.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_results_in_order_with_keyframe_hand_over() {
        let m = manager(3, 0.8);
        let localizer = Localizer::new(m.clone(), LocalizerConfig::default());
        localizer.set_engine(Box::new(PassThroughEngine { has_map: false, overlap: 0.5 }));
        let results = localizer.subscribe();

        for t in 0..5u64 {
            let pose = SE3::from_translation(Vector3::new(t as f64 * 0.5, 0.0, 0.0));
            localizer.add_new_data(observation(t, pose, room_cloud(t)));
        }
        localizer.run().unwrap();

        let received: Vec<LocalizationResult> = (0..4)
            .map(|_| results.recv_timeout(TIMEOUT).unwrap())
            .collect();

        for (i, r) in received.iter().enumerate() {
            let t = i as u64 + 1;
            assert_eq!(r.timestamp_ns, t);
            assert_eq!(r.frame_id, "world");
            // Refkf round trip leaves the odometry pose untouched
            assert_relative_eq!(
                r.pose.translation,
                Vector3::new(t as f64 * 0.5, 0.0, 0.0),
                epsilon = 1e-9
            );
            assert!(r.new_keyframe.is_some());
        }

        // Each keyframe becomes the reference of the next cycle
        for pair in received.windows(2) {
            assert_eq!(Some(pair[1].reference_vertex), pair[0].new_keyframe);
        }

        let stats = localizer.stats();
        assert_eq!(stats.published, 4);
        assert_eq!(stats.keyframes_added, 4);
        assert_eq!(m.num_keyframes(), 5);
        assert_eq!(localizer.latest_pose(), Some(received[3].pose));
    }

    #[test]
    fn test_icp_corrects_odometry() {
        let m = manager(3, 0.5);
        let localizer = Localizer::new(m.clone(), LocalizerConfig::default());
        localizer.set_engine(Box::new(IcpSequence::new(IcpConfig {
            max_iterations: 100,
            ..IcpConfig::default()
        })));
        let results = localizer.subscribe();
        localizer.run().unwrap();

        let map = room_cloud(42);
        localizer.add_new_data(observation(0, SE3::identity(), map.clone()));

        // Robot really at `truth`, odometry reports identity
        let truth = SE3::from_euler(0.0, 0.0, 0.02, Vector3::new(0.05, -0.04, 0.0));
        let reading: PointCloud = map.iter().map(|p| truth.inverse().transform_point(p)).collect();
        localizer.add_new_data(observation(1, SE3::identity(), reading));

        let result = results.recv_timeout(TIMEOUT).unwrap();
        assert_relative_eq!(result.pose.translation, truth.translation, epsilon = 5e-3);
        assert!(result.pose.rotation.angle_to(&truth.rotation) < 5e-3);
        assert!(result.overlap > 0.9);
        assert_eq!(result.new_keyframe, None);
        assert_eq!(m.num_keyframes(), 1);
    }

    #[test]
    fn test_empty_first_scan_does_not_bootstrap() {
        let m = manager(3, 0.8);
        let localizer = Localizer::new(m.clone(), LocalizerConfig::default());
        localizer.set_engine(Box::new(PassThroughEngine { has_map: false, overlap: 0.9 }));
        let results = localizer.subscribe();
        localizer.run().unwrap();

        localizer.add_new_data(observation(0, SE3::identity(), PointCloud::new()));
        assert!(wait_until(|| localizer.stats().processed == 1));
        assert_eq!(localizer.state(), LocalizerState::Uninitialized);
        assert_eq!(m.num_keyframes(), 0);

        for t in 1..6u64 {
            localizer.add_new_data(observation(t, SE3::identity(), room_cloud(t)));
        }
        assert!(wait_until(|| localizer.stats().processed == 6));

        let stats = localizer.stats();
        assert_eq!(stats.failed_registrations, 0);
        assert_eq!(stats.published, 4);
        assert_eq!(localizer.state(), LocalizerState::Tracking);
        assert!(localizer.get_local_map().1);
        assert_eq!(m.num_keyframes(), 1);
        assert_eq!(results.recv_timeout(TIMEOUT).unwrap().timestamp_ns, 2);
    }

    #[test]
    fn test_filtered_out_first_scan_does_not_bootstrap() {
        let m = manager(3, 0.8);
        let localizer = Localizer::new(m.clone(), LocalizerConfig::default());
        localizer.set_engine(Box::new(PassThroughEngine { has_map: false, overlap: 0.9 }));
        let filters =
            FilterChain::from_yaml_str("filters:\n  - type: max_distance\n    max: 5.0\n").unwrap();
        localizer.set_filters(filters);
        localizer.run().unwrap();

        // Every point lies 100 m away and is dropped by the filter
        let far: PointCloud = room_cloud(0)
            .iter()
            .map(|p| p + Vector3::new(100.0, 0.0, 0.0))
            .collect();
        localizer.add_new_data(observation(0, SE3::identity(), far));
        localizer.add_new_data(observation(1, SE3::identity(), room_cloud(1)));
        localizer.add_new_data(observation(2, SE3::identity(), room_cloud(2)));
        assert!(wait_until(|| localizer.stats().processed == 3));

        assert_eq!(localizer.state(), LocalizerState::Tracking);
        assert_eq!(localizer.stats().published, 1);
        assert_eq!(localizer.stats().failed_registrations, 0);
        assert_eq!(m.num_keyframes(), 1);
    }

    #[test]
    fn test_failing_registration_keeps_worker_alive() {
        let m = manager(3, 0.8);
        let localizer = Localizer::new(m.clone(), LocalizerConfig::default());
        localizer.set_engine(Box::new(FailingEngine));
        let results = localizer.subscribe();
        localizer.run().unwrap();

        for t in 0..3u64 {
            localizer.add_new_data(observation(t, SE3::identity(), room_cloud(t)));
        }
        assert!(wait_until(|| localizer.stats().processed == 3));

        let stats = localizer.stats();
        assert_eq!(stats.failed_registrations, 2);
        assert_eq!(stats.published, 0);
        assert!(results.try_recv().is_err());
        assert_eq!(localizer.state(), LocalizerState::Tracking);
        assert_eq!(m.num_keyframes(), 1);

        localizer.add_new_data(observation(3, SE3::identity(), room_cloud(3)));
        assert!(wait_until(|| localizer.stats().processed == 4));
    }

    #[test]
    fn test_low_overlap_is_counted() {
        let localizer = Localizer::new(manager(3, 0.8), LocalizerConfig::default());
        localizer.set_engine(Box::new(PassThroughEngine { has_map: false, overlap: 0.1 }));
        let results = localizer.subscribe();
        localizer.run().unwrap();

        localizer.add_new_data(observation(0, SE3::identity(), room_cloud(0)));
        localizer.add_new_data(observation(1, SE3::identity(), room_cloud(1)));

        let result = results.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(result.overlap, 0.1);
        assert_eq!(localizer.stats().low_overlap, 1);
    }

    #[test]
    fn test_external_pose_update_rebuilds_window() {
        let m = manager(3, 0.5);
        let localizer = Localizer::new(m.clone(), LocalizerConfig::default());
        localizer.set_engine(Box::new(PassThroughEngine { has_map: false, overlap: 0.9 }));
        let results = localizer.subscribe();
        localizer.run().unwrap();

        localizer.add_new_data(observation(0, SE3::identity(), room_cloud(0)));
        assert!(wait_until(|| localizer.state() == LocalizerState::Tracking));
        assert_eq!(localizer.stats().local_map_rebuilds, 1);

        let v = m.graph().read().last_vertex().unwrap();
        m.graph()
            .write()
            .update_pose(v, SE3::from_translation(Vector3::new(0.0, 0.0, 1.0)))
            .unwrap();

        localizer.add_new_data(observation(1, SE3::identity(), room_cloud(1)));
        let result = results.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(result.reference_vertex, v);
        assert_eq!(localizer.stats().local_map_rebuilds, 2);

        let (world, _) = localizer.get_local_map_in_world_frame();
        let (local, _) = localizer.get_local_map();
        assert_relative_eq!(
            world.points[0],
            local.points[0] + Vector3::new(0.0, 0.0, 1.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_config_files_are_loaded() {
        let localizer = Localizer::new(manager(3, 0.8), LocalizerConfig::default());

        let mut icp = tempfile::NamedTempFile::new().unwrap();
        writeln!(icp, "max_iterations: 10").unwrap();
        localizer.set_local_icp_config(icp.path()).unwrap();

        let mut filters = tempfile::NamedTempFile::new().unwrap();
        writeln!(filters, "filters:\n  - type: max_distance\n    max: 10.0").unwrap();
        localizer.set_input_filters_config(filters.path()).unwrap();

        let mut broken = tempfile::NamedTempFile::new().unwrap();
        writeln!(broken, "max_iterations: [").unwrap();
        assert!(localizer.set_local_icp_config(broken.path()).is_err());
        assert!(localizer.set_input_filters_config("/nonexistent/filters.yaml").is_err());
    }

    #[test]
    fn test_drop_stops_worker() {
        let localizer = Localizer::new(manager(3, 0.8), LocalizerConfig::default());
        let results = localizer.subscribe();
        localizer.run().unwrap();
        drop(localizer);
        assert!(results.recv_timeout(Duration::from_millis(100)).is_err());
    }
}
