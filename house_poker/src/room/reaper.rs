//! Background task that closes rooms nobody is using.

use std::{sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time::interval};

use super::{errors::RoomError, manager::RoomManager, messages::RoomSummary};

/// Configuration for the reaper task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaperConfig {
    /// How often to sweep the registry
    pub interval: Duration,
    /// How long a room may go without a state change
    pub idle_threshold: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            idle_threshold: Duration::from_secs(30 * 60),
        }
    }
}

/// Decides which rooms get closed.
pub trait ReapPolicy: Send + Sync {
    fn should_reap(&self, summary: &RoomSummary) -> bool;
}

/// Close rooms with nobody seated, or nothing happening for too long.
#[derive(Debug, Clone, Copy)]
pub struct IdleOrEmpty {
    pub idle_threshold: Duration,
}

impl ReapPolicy for IdleOrEmpty {
    fn should_reap(&self, summary: &RoomSummary) -> bool {
        summary.player_count == 0 || summary.idle_for >= self.idle_threshold
    }
}

/// Starts the background task that periodically closes rooms `policy` picks.
pub fn start_reaper_task<P>(
    manager: Arc<RoomManager>,
    config: ReaperConfig,
    policy: P,
) -> JoinHandle<()>
where
    P: ReapPolicy + 'static,
{
    log::info!(
        "Starting room reaper (every {}s, idle threshold {}s)",
        config.interval.as_secs(),
        config.idle_threshold.as_secs()
    );

    tokio::spawn(async move {
        let mut ticker = interval(config.interval);
        loop {
            ticker.tick().await;
            let reaped = reap_rooms(&manager, &policy).await;
            if reaped > 0 {
                log::info!("Reaped {reaped} rooms");
            }
        }
    })
}

/// Close every room `policy` selects, plus rooms whose actor already died.
///
/// # Returns
///
/// * `usize` - Number of rooms closed
pub async fn reap_rooms(manager: &RoomManager, policy: &dyn ReapPolicy) -> usize {
    let mut reaped = 0;

    for code in manager.room_codes().await {
        let result = match manager.get_summary(code).await {
            // The room only closes if nothing happened since the summary.
            Ok(summary) if policy.should_reap(&summary) => {
                manager.close_room_if_unchanged(&summary).await
            }
            Ok(_) => Ok(false),
            Err(RoomError::RoomClosed) => manager.close_room(code).await.map(|()| true),
            // Closed by someone else meanwhile.
            Err(_) => Ok(false),
        };

        match result {
            Ok(true) => {
                reaped += 1;
                log::debug!("Reaped room {code}");
            }
            Ok(false) => {}
            Err(err) => log::warn!("Failed to reap room {code}: {err}"),
        }
    }

    reaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        game::entities::{PlayerId, RoomCode, RoomStatus},
        room::config::RoomConfig,
    };

    struct Everything;

    impl ReapPolicy for Everything {
        fn should_reap(&self, _: &RoomSummary) -> bool {
            true
        }
    }

    fn summary(player_count: usize, idle_for: Duration) -> RoomSummary {
        RoomSummary {
            code: RoomCode::new(100_000).unwrap(),
            status: RoomStatus::Waiting,
            player_count,
            idle_for,
            revision: 0,
        }
    }

    #[test]
    fn test_idle_or_empty_policy() {
        let policy = IdleOrEmpty {
            idle_threshold: Duration::from_secs(60),
        };
        assert!(policy.should_reap(&summary(0, Duration::ZERO)));
        assert!(policy.should_reap(&summary(3, Duration::from_secs(60))));
        assert!(!policy.should_reap(&summary(3, Duration::from_secs(59))));
    }

    #[tokio::test]
    async fn test_reap_with_injected_policy() {
        let manager = RoomManager::new(RoomConfig::default()).unwrap();
        for name in ["a", "b", "c"] {
            manager
                .create_room(PlayerId::from(name), name.into(), None)
                .await
                .unwrap();
        }

        let fresh = IdleOrEmpty {
            idle_threshold: Duration::from_secs(3600),
        };
        assert_eq!(reap_rooms(&manager, &fresh).await, 0);
        assert_eq!(manager.active_room_count().await, 3);

        assert_eq!(reap_rooms(&manager, &Everything).await, 3);
        assert_eq!(manager.active_room_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_rooms_reaped_by_task() {
        let manager = Arc::new(RoomManager::new(RoomConfig::default()).unwrap());
        manager
            .create_room(PlayerId::from("a"), "a".into(), None)
            .await
            .unwrap();

        let config = ReaperConfig {
            interval: Duration::from_secs(10),
            idle_threshold: Duration::from_secs(25),
        };
        let policy = IdleOrEmpty {
            idle_threshold: config.idle_threshold,
        };
        let task = start_reaper_task(manager.clone(), config, policy);

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(manager.active_room_count().await, 1);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(manager.active_room_count().await, 0);
        task.abort();
    }
}
