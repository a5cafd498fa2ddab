//! Application state shared between the scan controller and presentation.
//!
//! The controller is the only writer of the scan fields (`scan_status`,
//! `facial_features`, `recommendations`, `scanned_at`, `scan`).
//! Presentation owns `selected_occasion`. Every write publishes a new
//! snapshot to subscribers.

use crate::state::ScanStatus;
use chrono::{DateTime, Utc};
use glowscan_core::{
    find_occasion, FacialFeatures, Occasion, OccasionRecommendations, RecommendationSet,
};
use glowscan_hw::FacingMode;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Read-mirror of the live session, for progress display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanProgress {
    pub progress: u8,
    pub message: String,
    pub face_detected: bool,
    pub facing_mode: FacingMode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppState {
    pub scan_status: ScanStatus,
    pub facial_features: Option<FacialFeatures>,
    pub recommendations: Option<RecommendationSet>,
    pub selected_occasion: Option<Occasion>,
    /// When the last scan completed.
    pub scanned_at: Option<DateTime<Utc>>,
    pub scan: ScanProgress,
}

impl AppState {
    /// The selected occasion's routine, or the first routine when nothing is selected.
    pub fn selected_recommendation(&self) -> Option<&OccasionRecommendations> {
        let set = self.recommendations.as_ref()?;
        self.selected_occasion
            .and_then(|occasion| find_occasion(set, occasion))
            .or_else(|| set.first())
    }
}

/// Clonable handle to the shared application state.
#[derive(Debug, Clone)]
pub struct Store {
    tx: Arc<watch::Sender<AppState>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AppState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> AppState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }

    /// Wait until the state satisfies `predicate`, returning that state.
    pub async fn wait_for(&self, mut predicate: impl FnMut(&AppState) -> bool) -> AppState {
        let mut rx = self.subscribe();
        let state = match rx.wait_for(|state| predicate(state)).await {
            Ok(state) => state.clone(),
            // The store holds the sender, so the channel cannot close under us.
            Err(_) => self.snapshot(),
        };
        state
    }

    pub async fn wait_for_status(&self, status: ScanStatus) -> AppState {
        self.wait_for(|state| state.scan_status == status).await
    }

    pub fn scan_status(&self) -> ScanStatus {
        self.tx.borrow().scan_status
    }

    pub fn facial_features(&self) -> Option<FacialFeatures> {
        self.tx.borrow().facial_features
    }

    pub fn recommendations(&self) -> Option<RecommendationSet> {
        self.tx.borrow().recommendations.clone()
    }

    pub fn selected_occasion(&self) -> Option<Occasion> {
        self.tx.borrow().selected_occasion
    }

    pub fn selected_recommendation(&self) -> Option<OccasionRecommendations> {
        self.tx.borrow().selected_recommendation().cloned()
    }

    pub fn set_scan_status(&self, status: ScanStatus) {
        self.tx.send_modify(|state| state.scan_status = status);
    }

    pub fn set_facial_features(&self, features: FacialFeatures) {
        self.tx.send_modify(|state| state.facial_features = Some(features));
    }

    pub fn set_recommendations(&self, recommendations: RecommendationSet) {
        self.tx
            .send_modify(|state| state.recommendations = Some(recommendations));
    }

    /// Publish features and their recommendations as one update.
    pub fn set_analysis(&self, features: FacialFeatures, recommendations: RecommendationSet) {
        self.tx.send_modify(|state| {
            state.facial_features = Some(features);
            state.recommendations = Some(recommendations);
        });
    }

    pub fn set_selected_occasion(&self, occasion: Option<Occasion>) {
        self.tx.send_modify(|state| state.selected_occasion = occasion);
    }

    pub fn set_scanned_at(&self, at: DateTime<Utc>) {
        self.tx.send_modify(|state| state.scanned_at = Some(at));
    }

    pub fn set_scan_progress(&self, scan: ScanProgress) {
        self.tx.send_if_modified(|state| {
            if state.scan == scan {
                return false;
            }
            state.scan = scan;
            true
        });
    }

    /// Clear every field back to its initial value in a single update.
    pub fn reset(&self) {
        self.tx.send_replace(AppState::default());
    }

    /// Clear every field except the progress mirror, which becomes `scan`,
    /// in a single update.
    pub fn reset_with(&self, scan: ScanProgress) {
        self.tx.send_replace(AppState {
            scan,
            ..AppState::default()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glowscan_core::{classify, recommend, FaceProportions, LandmarkSet};

    fn analysis() -> (FacialFeatures, RecommendationSet) {
        let features = classify(&LandmarkSet::synthetic(&FaceProportions::default()));
        (features, recommend(&features))
    }

    #[test]
    fn test_initial_state() {
        let store = Store::new();
        let state = store.snapshot();
        assert_eq!(state.scan_status, ScanStatus::Idle);
        assert!(state.facial_features.is_none());
        assert!(state.recommendations.is_none());
        assert!(state.selected_occasion.is_none());
        assert!(state.scanned_at.is_none());
    }

    #[test]
    fn test_fields_are_independent() {
        let store = Store::new();
        let (features, recs) = analysis();
        store.set_facial_features(features);
        assert_eq!(store.facial_features(), Some(features));
        assert!(store.recommendations().is_none());

        store.set_recommendations(recs);
        store.set_scan_status(ScanStatus::Scanning);
        assert_eq!(store.scan_status(), ScanStatus::Scanning);
        assert_eq!(store.facial_features(), Some(features));
    }

    #[test]
    fn test_reset_clears_everything() {
        let store = Store::new();
        let (features, recs) = analysis();
        store.set_analysis(features, recs);
        store.set_selected_occasion(Some(Occasion::Evening));
        store.set_scan_status(ScanStatus::Completed);
        store.set_scanned_at(Utc::now());

        let mut rx = store.subscribe();
        rx.mark_unchanged();
        store.reset();

        assert!(rx.has_changed().unwrap());
        assert_eq!(store.snapshot(), AppState::default());
    }

    #[test]
    fn test_reset_with_keeps_progress_in_one_update() {
        let store = Store::new();
        let (features, recs) = analysis();
        store.set_analysis(features, recs);
        store.set_scan_status(ScanStatus::Scanning);

        let scan = ScanProgress {
            progress: 0,
            message: "Preparing scanner...".into(),
            face_detected: false,
            facing_mode: FacingMode::Environment,
        };
        let mut rx = store.subscribe();
        rx.mark_unchanged();
        store.reset_with(scan.clone());

        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone();
        assert_eq!(state.scan_status, ScanStatus::Idle);
        assert!(state.facial_features.is_none());
        assert!(state.recommendations.is_none());
        assert_eq!(state.scan, scan);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_selected_recommendation_defaults_to_first() {
        let store = Store::new();
        assert!(store.selected_recommendation().is_none());

        let (features, recs) = analysis();
        store.set_analysis(features, recs);
        assert_eq!(
            store.selected_recommendation().unwrap().occasion,
            Occasion::Everyday
        );

        store.set_selected_occasion(Some(Occasion::Photoshoot));
        assert_eq!(
            store.selected_recommendation().unwrap().occasion,
            Occasion::Photoshoot
        );
    }

    #[test]
    fn test_unchanged_progress_does_not_notify() {
        let store = Store::new();
        let mut rx = store.subscribe();
        rx.mark_unchanged();
        store.set_scan_progress(ScanProgress::default());
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_wait_for_status() {
        let store = Store::new();
        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { store.wait_for_status(ScanStatus::Completed).await })
        };
        store.set_scan_status(ScanStatus::Processing);
        store.set_scan_status(ScanStatus::Completed);
        let state = waiter.await.unwrap();
        assert_eq!(state.scan_status, ScanStatus::Completed);
    }
}
