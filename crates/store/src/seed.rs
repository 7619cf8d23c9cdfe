//! First-run seed data.
//!
//! Documents are only written when their key is absent, so restarting a
//! server against an existing data directory never clobbers user data.

use chrono::{Duration, Utc};
use tutorlog_core::autofill::Student;
use tutorlog_core::notifications::Notification;
use tutorlog_core::records::{NewRecord, Record};
use tutorlog_core::roles::{Role, Session};
use tutorlog_core::types::Timestamp;

use crate::{keys, write_json, KeyValueStore, StoreError};

fn student(id: &str, name: &str, group: &str, mentor: &str, status: &str) -> Student {
    Student {
        id: id.into(),
        name: name.into(),
        group: group.into(),
        mentor: mentor.into(),
        status: status.into(),
    }
}

pub fn seed_students() -> Vec<Student> {
    vec![
        student("s1", "Mahliyo Xudoyberdiyeva", "GW112", "Nozila Yusupova", "coworking"),
        student("s2", "Sardor Alijonov", "GW113", "Jasur Rahimov", "group"),
        student("s3", "Nilufar Rahimova", "GW114", "Kamola Mirzayeva", "coworking"),
        student("s4", "Bekzod Tursunov", "GW112", "Nozila Yusupova", "coworking"),
        student("s5", "Zulfiya Qodirov", "GW115", "Sherzod Tursunov", "group"),
        student("s6", "Humoyun Baxtiyorov", "GW116", "Malika Hasanova", "coworking"),
        student("s7", "Kamola Umarova", "GW113", "Jasur Rahimov", "coworking"),
    ]
}

fn record(id: &str, owner: Session, payload: NewRecord, created_at: Timestamp) -> Record {
    let mut record = Record::create(&owner, payload, created_at);
    record.id = id.into();
    record
}

fn payload(date: &str, time: &str, group: &str, mentor: &str, student: &str, theme: &str, status: &str) -> NewRecord {
    NewRecord {
        date: date.into(),
        time: time.into(),
        group: group.into(),
        mentor: mentor.into(),
        student: student.into(),
        theme: theme.into(),
        status: status.into(),
    }
}

pub fn seed_records() -> Vec<Record> {
    let now = Utc::now();
    vec![
        record(
            "r1",
            Session::new("u1", "Aziza Karimova", Role::Support),
            payload("17.02.2026", "10:00", "GW112", "Nozila Yusupova", "Mahliyo Xudoyberdiyeva", "JS homework", "coworking"),
            now - Duration::days(2),
        ),
        record(
            "r2",
            Session::new("u2", "Bobur Toshmatov", Role::Support),
            payload("17.02.2026", "11:30", "GW113", "Jasur Rahimov", "Sardor Alijonov", "React basics", "group"),
            now - Duration::days(2),
        ),
        record(
            "r3",
            Session::new("u3", "Charos Umarova", Role::Support),
            payload("18.02.2026", "14:00", "GW114", "Kamola Mirzayeva", "Nilufar Rahimova", "CSS Grid", "coworking"),
            now - Duration::days(1),
        ),
    ]
}

/// Write seed documents for every absent collection key.
///
/// Returns the keys that were initialised.
pub fn seed_if_empty(store: &dyn KeyValueStore) -> Result<Vec<&'static str>, StoreError> {
    let mut seeded = Vec::new();

    if store.get(keys::STUDENTS)?.is_none() {
        write_json(store, keys::STUDENTS, &seed_students())?;
        seeded.push(keys::STUDENTS);
    }
    if store.get(keys::RECORDS)?.is_none() {
        write_json(store, keys::RECORDS, &seed_records())?;
        seeded.push(keys::RECORDS);
    }
    if store.get(keys::NOTIFICATIONS)?.is_none() {
        write_json(store, keys::NOTIFICATIONS, &Vec::<Notification>::new())?;
        seeded.push(keys::NOTIFICATIONS);
    }

    for key in &seeded {
        tracing::info!(key, "Initialized document");
    }
    Ok(seeded)
}
