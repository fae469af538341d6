use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

use crate::db::{ChatStore, ParticipationRow, StoreError};
use crate::models::*;

/// Latency budget of a query, reported alongside its result
struct Target {
    label: &'static str,
    millis: u64,
}

const ROOM_MESSAGES_TARGET: Target = Target { label: "< 100ms", millis: 100 };
const USER_MESSAGES_TARGET: Target = Target { label: "< 200ms", millis: 200 };
const ACTIVE_USERS_TARGET: Target = Target { label: "< 500ms", millis: 500 };
const USER_ROOMS_TARGET: Target = Target { label: "< 50ms", millis: 50 };

pub const DEFAULT_TOP_LIMIT: u32 = 10;

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

pub fn count_unique_users(user_ids: &[String]) -> usize {
    user_ids.iter().collect::<HashSet<_>>().len()
}

/// Bucket ISO-8601 timestamps by minute (`YYYY-MM-DDTHH:MM`)
pub fn messages_per_minute(timestamps: &[String]) -> BTreeMap<String, u64> {
    let mut buckets = BTreeMap::new();
    for ts in timestamps {
        let minute = ts.get(..16).unwrap_or(ts);
        *buckets.entry(minute.to_string()).or_insert(0) += 1;
    }
    buckets
}

/// Most active authors, highest message count first; ties by user id
pub fn top_users(authors: &[(String, String)], limit: u32) -> Vec<TopUser> {
    let mut counts: HashMap<(&str, &str), u64> = HashMap::new();
    for (user_id, username) in authors {
        *counts.entry((user_id.as_str(), username.as_str())).or_insert(0) += 1;
    }
    let mut users: Vec<TopUser> = counts
        .into_iter()
        .map(|((user_id, username), message_count)| TopUser {
            user_id: user_id.to_string(),
            username: if username.is_empty() { "unknown".to_string() } else { username.to_string() },
            message_count,
        })
        .collect();
    users.sort_by(|a, b| b.message_count.cmp(&a.message_count).then_with(|| a.user_id.cmp(&b.user_id)));
    users.truncate(limit as usize);
    users
}

/// Most active rooms, highest message count first; ties by room id
pub fn top_rooms(room_ids: &[String], limit: u32) -> Vec<TopRoom> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for room_id in room_ids {
        *counts.entry(room_id.as_str()).or_insert(0) += 1;
    }
    let mut rooms: Vec<TopRoom> = counts
        .into_iter()
        .map(|(room_id, message_count)| TopRoom { room_id: room_id.to_string(), message_count })
        .collect();
    rooms.sort_by(|a, b| b.message_count.cmp(&a.message_count).then_with(|| a.room_id.cmp(&b.room_id)));
    rooms.truncate(limit as usize);
    rooms
}

pub fn rooms_of_user(rows: Vec<ParticipationRow>) -> Vec<RoomParticipation> {
    rows.into_iter()
        .map(|row| RoomParticipation {
            room_id: row.room_id,
            message_count: row.message_count.unwrap_or(0),
            last_activity_time: row.last_activity_time.unwrap_or_default(),
        })
        .collect()
}

/// Distribution of users by number of rooms they posted in
pub fn participation_summary(rows: &[ParticipationRow]) -> UserParticipationResponse {
    let mut rooms_per_user: HashMap<&str, u64> = HashMap::new();
    for row in rows {
        *rooms_per_user.entry(row.user_id.as_str()).or_insert(0) += 1;
    }

    let mut distribution = ParticipationDistribution::default();
    for &room_count in rooms_per_user.values() {
        match room_count {
            1 => distribution.single_room += 1,
            2..=3 => distribution.light_users += 1,
            4..=5 => distribution.moderate_users += 1,
            _ => distribution.heavy_users += 1,
        }
    }

    let total_users = rooms_per_user.len();
    let average = if total_users == 0 {
        0.0
    } else {
        rooms_per_user.values().sum::<u64>() as f64 / total_users as f64
    };

    UserParticipationResponse {
        total_users,
        average_rooms_per_user: format!("{:.2}", average),
        distribution,
    }
}

pub async fn room_messages(store: &ChatStore, room_id: &str, start: &str, end: &str) -> Result<RoomMessagesResponse, StoreError> {
    let started = Instant::now();
    let rows = store.room_messages(room_id, start, end).await?;
    let query_time_ms = elapsed_ms(started);
    Ok(RoomMessagesResponse {
        room_id: room_id.to_string(),
        start_time: start.to_string(),
        end_time: end.to_string(),
        message_count: rows.len(),
        query_time_ms,
        performance_target: ROOM_MESSAGES_TARGET.label.to_string(),
        performance_met: query_time_ms < ROOM_MESSAGES_TARGET.millis,
    })
}

pub async fn user_messages(
    store: &ChatStore,
    user_id: &str,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<UserMessagesResponse, StoreError> {
    let started = Instant::now();
    let range = start.zip(end);
    let rows = store.user_messages(user_id, range).await?;
    let query_time_ms = elapsed_ms(started);
    let messages: Vec<QueueMessage> = rows.into_iter().map(QueueMessage::from).collect();
    Ok(UserMessagesResponse {
        user_id: user_id.to_string(),
        message_count: messages.len(),
        messages,
        query_time_ms,
        performance_target: USER_MESSAGES_TARGET.label.to_string(),
        performance_met: query_time_ms < USER_MESSAGES_TARGET.millis,
    })
}

pub async fn active_users(store: &ChatStore, start: &str, end: &str) -> Result<ActiveUsersResponse, StoreError> {
    let started = Instant::now();
    let user_ids = store.user_ids_between(start, end).await?;
    let active_user_count = count_unique_users(&user_ids);
    let query_time_ms = elapsed_ms(started);
    Ok(ActiveUsersResponse {
        start_time: start.to_string(),
        end_time: end.to_string(),
        active_user_count,
        query_time_ms,
        performance_target: ACTIVE_USERS_TARGET.label.to_string(),
        performance_met: query_time_ms < ACTIVE_USERS_TARGET.millis,
    })
}

pub async fn user_rooms(store: &ChatStore, user_id: &str) -> Result<UserRoomsResponse, StoreError> {
    let started = Instant::now();
    let rows = store.user_participation(user_id).await?;
    let query_time_ms = elapsed_ms(started);
    let rooms = rooms_of_user(rows);
    Ok(UserRoomsResponse {
        user_id: user_id.to_string(),
        room_count: rooms.len(),
        rooms,
        query_time_ms,
        performance_target: USER_ROOMS_TARGET.label.to_string(),
        performance_met: query_time_ms < USER_ROOMS_TARGET.millis,
    })
}

pub async fn messages_per_minute_between(store: &ChatStore, start: &str, end: &str) -> Result<MessagesPerMinuteResponse, StoreError> {
    let timestamps = store.timestamps_between(start, end).await?;
    Ok(MessagesPerMinuteResponse {
        start_time: start.to_string(),
        end_time: end.to_string(),
        messages_per_minute: messages_per_minute(&timestamps),
    })
}

pub async fn top_users_report(store: &ChatStore, limit: u32) -> Result<TopUsersResponse, StoreError> {
    let authors = store.message_authors().await?;
    Ok(TopUsersResponse { top_users: top_users(&authors, limit), limit })
}

pub async fn top_rooms_report(store: &ChatStore, limit: u32) -> Result<TopRoomsResponse, StoreError> {
    let rooms = store.message_rooms().await?;
    Ok(TopRoomsResponse { top_rooms: top_rooms(&rooms, limit), limit })
}

pub async fn user_participation(store: &ChatStore) -> Result<UserParticipationResponse, StoreError> {
    let rows = store.all_participation().await?;
    Ok(participation_summary(&rows))
}

/// Every query and analytic for the last hour
pub async fn all_metrics(store: &ChatStore) -> Result<AllMetricsResponse, StoreError> {
    let now = Utc::now();
    let end = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let start = (now - ChronoDuration::hours(1)).to_rfc3339_opts(SecondsFormat::Millis, true);

    Ok(AllMetricsResponse {
        sample_room_messages: room_messages(store, "1", &start, &end).await?,
        active_users: active_users(store, &start, &end).await?,
        top_users: top_users_report(store, DEFAULT_TOP_LIMIT).await?,
        top_rooms: top_rooms_report(store, DEFAULT_TOP_LIMIT).await?,
        messages_per_minute: messages_per_minute_between(store, &start, &end).await?,
        user_participation: user_participation(store).await?,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        query_note: "All core queries and analytics executed".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn participation(user_id: &str, room_id: &str) -> ParticipationRow {
        ParticipationRow {
            user_id: user_id.to_string(),
            room_id: room_id.to_string(),
            message_count: Some(1),
            last_activity_time: None,
        }
    }

    #[test]
    fn counts_distinct_users() {
        assert_eq!(count_unique_users(&strings(&["u1", "u2", "u1", "u3", "u2"])), 3);
        assert_eq!(count_unique_users(&[]), 0);
    }

    #[test]
    fn buckets_timestamps_by_minute() {
        let buckets = messages_per_minute(&strings(&[
            "2025-01-01T10:00:05Z",
            "2025-01-01T10:00:59.999Z",
            "2025-01-01T10:01:00Z",
            "short",
        ]));
        assert_eq!(buckets.get("2025-01-01T10:00"), Some(&2));
        assert_eq!(buckets.get("2025-01-01T10:01"), Some(&1));
        assert_eq!(buckets.get("short"), Some(&1));
    }

    #[test]
    fn ranks_top_users_and_applies_limit() {
        let authors: Vec<(String, String)> = [("u1", "ann"), ("u2", "bob"), ("u1", "ann"), ("u3", ""), ("u2", "bob"), ("u1", "ann")]
            .iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect();

        let top = top_users(&authors, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0], TopUser { user_id: "u1".into(), username: "ann".into(), message_count: 3 });
        assert_eq!(top[1].user_id, "u2");

        let all = top_users(&authors, 10);
        assert_eq!(all[2].username, "unknown");
    }

    #[test]
    fn ranks_top_rooms_with_stable_ties() {
        let top = top_rooms(&strings(&["b", "a", "c", "c"]), 10);
        let ids: Vec<&str> = top.iter().map(|r| r.room_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(top[0].message_count, 2);
    }

    #[test]
    fn summarizes_participation_levels() {
        let mut rows = vec![participation("solo", "r1")];
        rows.extend((1..=3).map(|i| participation("light", &format!("r{i}"))));
        rows.extend((1..=5).map(|i| participation("moderate", &format!("r{i}"))));
        rows.extend((1..=7).map(|i| participation("heavy", &format!("r{i}"))));

        let summary = participation_summary(&rows);
        assert_eq!(summary.total_users, 4);
        assert_eq!(summary.average_rooms_per_user, "4.00");
        assert_eq!(
            summary.distribution,
            ParticipationDistribution { single_room: 1, light_users: 1, moderate_users: 1, heavy_users: 1 }
        );
    }

    #[test]
    fn empty_participation_averages_to_zero() {
        let summary = participation_summary(&[]);
        assert_eq!(summary.total_users, 0);
        assert_eq!(summary.average_rooms_per_user, "0.00");
    }

    #[test]
    fn missing_participation_fields_get_defaults() {
        let rooms = rooms_of_user(vec![ParticipationRow {
            user_id: "u1".into(),
            room_id: "r9".into(),
            message_count: None,
            last_activity_time: None,
        }]);
        assert_eq!(rooms, vec![RoomParticipation { room_id: "r9".into(), message_count: 0, last_activity_time: String::new() }]);
    }
}
