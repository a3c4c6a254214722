// Session directory: pairs connections into rooms and owns room lifecycles.

use crate::domain::PlayerId;
use crate::use_cases::room::{RoomHandle, RoomSettings};
use crate::use_cases::{JoinError, RoomBroadcast, RoomCommand, RoomStatus};
use crate::utils::{now_millis, rand_id};
use axum::extract::ws::Utf8Bytes;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Everything a connection needs after being seated.
pub struct JoinTicket {
    pub room: RoomHandle,
    pub player_id: PlayerId,
    pub is_host: bool,
    pub host_id: PlayerId,
    /// Participants in the room including the joiner, ascending.
    pub player_ids: Vec<PlayerId>,
    /// Serialized room events, subscribed before the join is announced.
    pub bytes_rx: broadcast::Receiver<Utf8Bytes>,
    pub status_rx: watch::Receiver<RoomStatus>,
    /// Present only when this join created the room; feeds its serializer.
    pub serializer_rx: Option<broadcast::Receiver<RoomBroadcast>>,
}

/// Result of removing a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    Left,
    /// The participant was the last one; the room was torn down.
    RoomClosed,
}

/// Snapshot of one room for listings.
#[derive(Debug, Clone)]
pub struct RoomSummary {
    pub room_id: Arc<str>,
    pub status: RoomStatus,
    pub participants: usize,
}

struct RoomEntry {
    room: RoomHandle,
    participants: BTreeSet<PlayerId>,
    /// Creation order; the oldest open room is filled first.
    opened_seq: u64,
}

#[derive(Default)]
struct DirectoryIndex {
    rooms: HashMap<Arc<str>, RoomEntry>,
    participants: HashMap<PlayerId, Arc<str>>,
    next_seq: u64,
}

/// A slot held in the index while the room decides on the join.
struct Reservation {
    room: RoomHandle,
    bytes_rx: broadcast::Receiver<Utf8Bytes>,
    status_rx: watch::Receiver<RoomStatus>,
    serializer_rx: Option<broadcast::Receiver<RoomBroadcast>>,
}

/// Thread-safe registry of rooms and their participants.
pub struct SessionDirectory {
    /// Settings applied to newly created rooms.
    settings: RoomSettings,
    index: Mutex<DirectoryIndex>,
}

impl SessionDirectory {
    /// Creates an empty directory with the provided room settings.
    pub fn new(settings: RoomSettings) -> Self {
        Self {
            settings,
            index: Mutex::new(DirectoryIndex::default()),
        }
    }

    /// Seats a participant, either in the requested room or in the oldest
    /// waiting room with a free slot, creating a room when none qualifies.
    ///
    /// The room itself has the last word: a room that started while the
    /// join was queued refuses it, the slot is released, and auto-pairing
    /// moves on to another room.
    pub async fn join(
        &self,
        player_id: PlayerId,
        room_id: Option<&str>,
    ) -> Result<JoinTicket, JoinError> {
        let mut refused: Vec<Arc<str>> = Vec::new();
        loop {
            let reservation = self.reserve(player_id, room_id, &refused).await?;

            // Never await room replies while holding the index lock.
            match reservation.room.join(player_id).await {
                Ok(seat) => {
                    info!(
                        room_id = %reservation.room.room_id,
                        player_id,
                        is_host = seat.is_host,
                        "participant seated"
                    );
                    return Ok(JoinTicket {
                        room: reservation.room,
                        player_id,
                        is_host: seat.is_host,
                        host_id: seat.host_id,
                        player_ids: seat.player_ids,
                        bytes_rx: reservation.bytes_rx,
                        status_rx: reservation.status_rx,
                        serializer_rx: reservation.serializer_rx,
                    });
                }
                Err(err) => {
                    debug!(room_id = %reservation.room.room_id, player_id, %err, "room refused join");
                    self.leave(player_id).await;
                    if room_id.is_some() || err != JoinError::GameInProgress {
                        return Err(err);
                    }
                    refused.push(reservation.room.room_id.clone());
                }
            }
        }
    }

    async fn reserve(
        &self,
        player_id: PlayerId,
        room_id: Option<&str>,
        refused: &[Arc<str>],
    ) -> Result<Reservation, JoinError> {
        let capacity = self.settings.room_capacity;
        let mut guard = self.index.lock().await;
        let index = &mut *guard;
        if index.participants.contains_key(&player_id) {
            return Err(JoinError::AlreadyJoined);
        }

        let existing = match room_id {
            Some(id) => {
                let entry = index.rooms.get(id).ok_or(JoinError::RoomNotFound)?;
                if !entry.room.is_waiting() {
                    return Err(JoinError::GameInProgress);
                }
                if entry.participants.len() >= capacity {
                    return Err(JoinError::RoomFull);
                }
                Some(entry.room.room_id.clone())
            }
            None => index
                .rooms
                .values()
                .filter(|entry| entry.room.is_waiting() && entry.participants.len() < capacity)
                .filter(|entry| !refused.contains(&entry.room.room_id))
                .min_by_key(|entry| entry.opened_seq)
                .map(|entry| entry.room.room_id.clone()),
        };

        let (target, serializer_rx) = match existing {
            Some(target) => (target, None),
            None => {
                let target: Arc<str> = Arc::from(format!("room-{}", rand_id()));
                let (room, serializer_rx) = RoomHandle::spawn(target.clone(), &self.settings);
                let opened_seq = index.next_seq;
                index.next_seq += 1;
                index.rooms.insert(
                    target.clone(),
                    RoomEntry {
                        room,
                        participants: BTreeSet::new(),
                        opened_seq,
                    },
                );
                info!(room_id = %target, "room created");
                (target, Some(serializer_rx))
            }
        };

        let entry = index
            .rooms
            .get_mut(&target)
            .ok_or(JoinError::RoomNotFound)?;
        entry.participants.insert(player_id);
        index.participants.insert(player_id, target);

        Ok(Reservation {
            room: entry.room.clone(),
            bytes_rx: entry.room.subscribe_bytes(),
            status_rx: entry.room.subscribe_status(),
            serializer_rx,
        })
    }

    /// Removes a participant; returns None when the id was not seated.
    pub async fn leave(&self, player_id: PlayerId) -> Option<LeaveOutcome> {
        let room = {
            let mut guard = self.index.lock().await;
            let index = &mut *guard;
            let room_id = index.participants.remove(&player_id)?;
            let entry = index.rooms.get_mut(&room_id)?;
            entry.participants.remove(&player_id);

            if entry.participants.is_empty() {
                if let Some(entry) = index.rooms.remove(&room_id) {
                    entry.room.stop();
                }
                info!(room_id = %room_id, player_id, "last participant left; room closed");
                return Some(LeaveOutcome::RoomClosed);
            }
            entry.room.clone()
        };

        // The room hands hostship over itself when the host leaves.
        room.send(RoomCommand::Leave { player_id }).await;
        Some(LeaveOutcome::Left)
    }

    /// Evicts every participant of rooms idle longer than `idle_timeout`.
    pub async fn sweep_idle(&self, now: u64, idle_timeout: Duration) -> Vec<Arc<str>> {
        let timeout_ms = u64::try_from(idle_timeout.as_millis()).unwrap_or(u64::MAX);
        let stale: Vec<(Arc<str>, Vec<PlayerId>)> = {
            let index = self.index.lock().await;
            index
                .rooms
                .iter()
                .filter(|(_, entry)| now.saturating_sub(entry.room.last_activity()) > timeout_ms)
                .map(|(room_id, entry)| {
                    (room_id.clone(), entry.participants.iter().copied().collect())
                })
                .collect()
        };

        let mut evicted = Vec::with_capacity(stale.len());
        for (room_id, participants) in stale {
            warn!(room_id = %room_id, participants = participants.len(), "evicting idle room");
            for player_id in participants {
                self.leave(player_id).await;
            }
            evicted.push(room_id);
        }
        evicted
    }

    /// Spawns the periodic idle sweep.
    pub fn spawn_idle_sweeper(
        self: Arc<Self>,
        every: Duration,
        idle_timeout: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let evicted = self.sweep_idle(now_millis(), idle_timeout).await;
                if !evicted.is_empty() {
                    info!(count = evicted.len(), "idle sweep finished");
                }
            }
        })
    }

    /// Lists live rooms, oldest first.
    pub async fn room_summaries(&self) -> Vec<RoomSummary> {
        let index = self.index.lock().await;
        let mut entries: Vec<&RoomEntry> = index.rooms.values().collect();
        entries.sort_by_key(|entry| entry.opened_seq);
        entries
            .into_iter()
            .map(|entry| RoomSummary {
                room_id: entry.room.room_id.clone(),
                status: entry.room.status(),
                participants: entry.participants.len(),
            })
            .collect()
    }

    pub async fn room_exists(&self, room_id: &str) -> bool {
        self.index.lock().await.rooms.contains_key(room_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GameTuning, RoomPhase};
    use tokio::time::timeout;

    fn directory() -> SessionDirectory {
        SessionDirectory::new(RoomSettings {
            command_channel_capacity: 64,
            broadcast_capacity: 256,
            tick_interval: Duration::from_millis(5),
            room_capacity: 2,
            tuning: GameTuning::default(),
        })
    }

    async fn wait_for_event<F>(rx: &mut broadcast::Receiver<RoomBroadcast>, mut pred: F)
    where
        F: FnMut(&RoomBroadcast) -> bool,
    {
        timeout(Duration::from_secs(2), async {
            loop {
                match rx.recv().await {
                    Ok(event) if pred(&event) => return,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => panic!("room events closed"),
                }
            }
        })
        .await
        .expect("event should arrive");
    }

    #[tokio::test]
    async fn pairs_two_participants_then_opens_a_new_room() {
        let directory = directory();

        let first = directory.join(10, None).await.expect("first join");
        assert!(first.is_host);
        assert!(first.serializer_rx.is_some());
        assert_eq!(first.player_ids, vec![10]);

        let second = directory.join(20, None).await.expect("second join");
        assert!(!second.is_host);
        assert!(second.serializer_rx.is_none());
        assert_eq!(second.room.room_id, first.room.room_id);
        assert_eq!(second.host_id, 10);
        assert_eq!(second.player_ids, vec![10, 20]);

        let third = directory.join(30, None).await.expect("third join");
        assert!(third.is_host);
        assert_ne!(third.room.room_id, first.room.room_id);

        let summaries = directory.room_summaries().await;
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].participants, 2);
        assert_eq!(summaries[1].participants, 1);
    }

    #[tokio::test]
    async fn rejects_duplicate_unknown_and_full_joins() {
        let directory = directory();
        let ticket = directory.join(1, None).await.expect("join");
        let room_id = ticket.room.room_id.clone();

        assert_eq!(
            directory.join(1, None).await.err(),
            Some(JoinError::AlreadyJoined)
        );
        assert_eq!(
            directory.join(2, Some("room-missing")).await.err(),
            Some(JoinError::RoomNotFound)
        );

        directory.join(2, Some(&room_id)).await.expect("second seat");
        assert_eq!(
            directory.join(3, Some(&room_id)).await.err(),
            Some(JoinError::RoomFull)
        );
    }

    #[tokio::test]
    async fn started_rooms_reject_joins() {
        let directory = directory();
        let ticket = directory.join(1, None).await.expect("join");
        let mut status = ticket.status_rx.clone();

        ticket.room.send(RoomCommand::StartGame { player_id: 1 }).await;
        timeout(
            Duration::from_secs(2),
            status.wait_for(|s| *s == RoomStatus::Open(RoomPhase::Started)),
        )
        .await
        .expect("start in time")
        .expect("status");

        assert_eq!(
            directory.join(2, Some(&ticket.room.room_id)).await.err(),
            Some(JoinError::GameInProgress)
        );
        // Auto-pairing skips the started room.
        let other = directory.join(2, None).await.expect("join");
        assert_ne!(other.room.room_id, ticket.room.room_id);
    }

    fn participants_of(summaries: &[RoomSummary], room_id: &str) -> Option<usize> {
        summaries
            .iter()
            .find(|summary| &*summary.room_id == room_id)
            .map(|summary| summary.participants)
    }

    #[tokio::test]
    async fn targeted_join_behind_a_queued_start_is_rolled_back() {
        let directory = directory();
        let ticket = directory.join(1, None).await.expect("join");
        let room_id = ticket.room.room_id.clone();

        // The start is still queued when the second join reserves its slot.
        ticket.room.send(RoomCommand::StartGame { player_id: 1 }).await;
        assert_eq!(
            directory.join(2, Some(&room_id)).await.err(),
            Some(JoinError::GameInProgress)
        );

        let summaries = directory.room_summaries().await;
        assert_eq!(participants_of(&summaries, &room_id), Some(1));
        assert_eq!(directory.leave(2).await, None);
        assert!(directory.join(2, None).await.is_ok());
    }

    #[tokio::test]
    async fn auto_pair_behind_a_queued_start_opens_another_room() {
        let directory = directory();
        let ticket = directory.join(1, None).await.expect("join");
        let room_id = ticket.room.room_id.clone();

        ticket.room.send(RoomCommand::StartGame { player_id: 1 }).await;
        let other = directory.join(2, None).await.expect("join elsewhere");
        assert_ne!(other.room.room_id, room_id);
        assert!(other.is_host);
        assert_eq!(other.player_ids, vec![2]);

        let summaries = directory.room_summaries().await;
        assert_eq!(participants_of(&summaries, &room_id), Some(1));
        assert_eq!(participants_of(&summaries, &other.room.room_id), Some(1));
    }

    #[tokio::test]
    async fn host_departure_promotes_remaining_participant() {
        let directory = directory();
        let host = directory.join(5, None).await.expect("host join");
        let guest = directory.join(9, None).await.expect("guest join");
        let mut events = guest.room.subscribe_events();

        assert_eq!(directory.leave(5).await, Some(LeaveOutcome::Left));
        wait_for_event(&mut events, |e| {
            matches!(e, RoomBroadcast::NewHost { host_id: 9 })
        })
        .await;

        guest.room.send(RoomCommand::StartGame { player_id: 9 }).await;
        wait_for_event(&mut events, |e| matches!(e, RoomBroadcast::GameStarted)).await;
        drop(host);
    }

    #[tokio::test]
    async fn last_leave_closes_room_once() {
        let directory = directory();
        let ticket = directory.join(1, None).await.expect("join");
        let mut status = ticket.status_rx.clone();

        assert_eq!(directory.leave(1).await, Some(LeaveOutcome::RoomClosed));
        assert_eq!(directory.leave(1).await, None);
        assert!(!directory.room_exists(&ticket.room.room_id).await);
        assert!(!ticket.room.stop());

        timeout(
            Duration::from_secs(2),
            status.wait_for(|s| *s == RoomStatus::Closed),
        )
        .await
        .expect("close in time")
        .expect("status");
    }

    #[tokio::test]
    async fn idle_rooms_are_swept() {
        let directory = directory();
        let idle = directory.join(1, None).await.expect("join");
        let idle_room = idle.room.room_id.clone();

        let timeout_window = Duration::from_secs(300);
        assert!(directory.sweep_idle(now_millis(), timeout_window).await.is_empty());

        let later = now_millis() + 301_000;
        let evicted = directory.sweep_idle(later, timeout_window).await;
        assert_eq!(evicted, vec![idle_room.clone()]);
        assert!(!directory.room_exists(&idle_room).await);
        assert!(directory.room_summaries().await.is_empty());
        assert_eq!(directory.leave(1).await, None);
    }
}
