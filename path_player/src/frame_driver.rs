// frame_driver.rs - Background task that feeds frames to the shared session

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::animation::{PlaybackNotice, ViewerSession};

/// Session shared between the frame driver, the refresh loop and HTTP handlers
pub type SharedSession = Arc<Mutex<ViewerSession>>;

pub fn shared(session: ViewerSession) -> SharedSession {
    Arc::new(Mutex::new(session))
}

/// Call `ViewerSession::frame` every `interval`.
///
/// Each tick holds the lock for one frame only, so frames never overlap with
/// each other or with control requests.
pub fn spawn_frame_driver(session: SharedSession, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        log::info!("Frame driver running every {:?}", interval);

        loop {
            ticker.tick().await;
            let notices = session.lock().await.frame();
            for notice in notices {
                match notice {
                    PlaybackNotice::WaypointReached(index) => log::debug!("Waypoint {} reached", index),
                    PlaybackNotice::Completed => log::info!("Playback completed"),
                }
            }
        }
    })
}
