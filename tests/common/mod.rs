//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use portfolio_admin::storage::{
    CaseStudy, Category, Clock, Inquiry, NewCaseStudy, NewInquiry, NewTestimonial, PlatformType,
    ProjectType, Rating, RecordStore, SqliteStorage, Testimonial,
};

/// A clock that only moves when told to.
pub struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    pub fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

/// In-memory store whose timestamps come from the returned clock.
pub async fn storage_at(now: DateTime<Utc>) -> (SqliteStorage, Arc<TestClock>) {
    let clock = TestClock::at(now);
    let storage = SqliteStorage::new_in_memory()
        .await
        .expect("Failed to create in-memory storage")
        .with_clock(clock.clone());
    (storage, clock)
}

pub fn inquiry(name: &str, project_type: ProjectType) -> NewInquiry {
    NewInquiry {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        phone: None,
        company: None,
        project_type,
        budget: None,
        timeline: None,
        message: format!("Project request from {}", name),
        source: Default::default(),
    }
}

pub async fn seed_inquiry(storage: &SqliteStorage, name: &str) -> Inquiry {
    storage
        .insert(&inquiry(name, ProjectType::Web))
        .await
        .expect("Failed to insert inquiry")
}

pub async fn seed_case_study(storage: &SqliteStorage, title: &str, is_public: bool) -> CaseStudy {
    let mut study = NewCaseStudy::new(
        title,
        format!("{} description", title),
        Category::Mobile,
        PlatformType::CrossPlatform,
    );
    study.is_public = is_public;
    storage
        .insert(&study)
        .await
        .expect("Failed to insert case study")
}

pub async fn seed_testimonial(storage: &SqliteStorage, name: &str, rating: i64) -> Testimonial {
    let testimonial = NewTestimonial::new(
        name,
        format!("{} was great to work with", name),
        Rating::new(rating).unwrap(),
    );
    storage
        .insert(&testimonial)
        .await
        .expect("Failed to insert testimonial")
}
