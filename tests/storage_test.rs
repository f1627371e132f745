//! Integration tests for the SQLite record store
//!
//! Tests inserts, partial updates, deletes, queries, and grouping against an
//! in-memory SQLite database.

mod common;

use chrono::{Duration, FixedOffset, NaiveDate};

use common::{seed_case_study, seed_inquiry, seed_testimonial, storage_at, utc};
use portfolio_admin::error::StorageError;
use portfolio_admin::storage::{
    CaseStudy, CaseStudyField, CaseStudyFilter, CaseStudyPatch, GroupCount, Inquiry, InquiryField,
    InquiryFilter, InquiryPatch, InquiryStatus, MonthlyCount, NewTestimonial, Priority,
    ProjectType, Rating, RecordQuery, RecordReader, RecordStore, SqliteStorage, Testimonial,
    TestimonialFilter, TestimonialPatch,
};

#[cfg(test)]
mod insert_tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamps() {
        let (storage, _clock) = storage_at(utc(2026, 3, 14, 9)).await;

        let inquiry = seed_inquiry(&storage, "Ada").await;

        assert!(!inquiry.id.is_empty());
        assert_eq!(inquiry.created_at, utc(2026, 3, 14, 9));
        assert_eq!(inquiry.updated_at, inquiry.created_at);
        assert_eq!(inquiry.status, InquiryStatus::New);
        assert_eq!(inquiry.priority, Priority::Medium);
    }

    #[tokio::test]
    async fn test_insert_ids_are_unique() {
        let (storage, _clock) = storage_at(utc(2026, 3, 14, 9)).await;

        let first = seed_inquiry(&storage, "Ada").await;
        let second = seed_inquiry(&storage, "Ada").await;

        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_case_study_json_columns_survive_storage() {
        let (storage, _clock) = storage_at(utc(2026, 3, 14, 9)).await;

        let mut study = portfolio_admin::storage::NewCaseStudy::new(
            "Rider app",
            "Ride hailing for a regional operator",
            portfolio_admin::storage::Category::Mobile,
            portfolio_admin::storage::PlatformType::Android,
        );
        study.tech_stack = vec!["kotlin".to_string(), "postgres".to_string()];
        study.tags = vec!["transport".to_string()];
        study.start_date = NaiveDate::from_ymd_opt(2025, 1, 1);
        study.end_date = NaiveDate::from_ymd_opt(2025, 3, 2);

        let created = storage.insert(&study).await.unwrap();
        let fetched: CaseStudy = storage.find_by_id(&created.id).await.unwrap().unwrap();

        assert_eq!(fetched.tech_stack, vec!["kotlin", "postgres"]);
        assert_eq!(fetched.tags, vec!["transport"]);
        assert_eq!(fetched.duration_days, Some(60));
        assert!(fetched.images.is_empty());
    }

    #[tokio::test]
    async fn test_insert_with_unknown_reference_writes_nothing() {
        let (storage, _clock) = storage_at(utc(2026, 3, 14, 9)).await;

        let mut orphan = NewTestimonial::new("Bob", "Great", Rating::new(5).unwrap());
        orphan.case_study_id = Some("no-such-study".to_string());

        let err = storage.insert(&orphan).await.unwrap_err();
        match err {
            StorageError::MissingReference { column, id } => {
                assert_eq!(column, "case_study_id");
                assert_eq!(id, "no-such-study");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let total = storage
            .count::<Testimonial>(&RecordQuery::all())
            .await
            .unwrap();
        assert_eq!(total, 0);
    }
}

#[cfg(test)]
mod update_tests {
    use super::*;

    #[tokio::test]
    async fn test_update_touches_only_present_fields() {
        let (storage, clock) = storage_at(utc(2026, 3, 14, 9)).await;
        let inquiry = seed_inquiry(&storage, "Grace").await;

        clock.advance(Duration::hours(2));
        let patch = InquiryPatch {
            status: Some(InquiryStatus::InProgress),
            notes: Some("Called back".to_string()),
            ..Default::default()
        };
        let updated: Inquiry = storage
            .update(&inquiry.id, &patch)
            .await
            .unwrap()
            .expect("inquiry should exist");

        assert_eq!(updated.status, InquiryStatus::InProgress);
        assert_eq!(updated.notes.as_deref(), Some("Called back"));
        assert_eq!(updated.priority, inquiry.priority);
        assert_eq!(updated.message, inquiry.message);
        assert_eq!(updated.created_at, inquiry.created_at);
        assert_eq!(updated.updated_at, utc(2026, 3, 14, 11));
    }

    #[tokio::test]
    async fn test_update_missing_record_returns_none() {
        let (storage, _clock) = storage_at(utc(2026, 3, 14, 9)).await;

        let patch = InquiryPatch {
            status: Some(InquiryStatus::Closed),
            ..Default::default()
        };
        let result = storage
            .update::<Inquiry>("nonexistent-id", &patch)
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_empty_patch_leaves_record_untouched() {
        let (storage, clock) = storage_at(utc(2026, 3, 14, 9)).await;
        let testimonial = seed_testimonial(&storage, "Linus", 4).await;

        clock.advance(Duration::days(1));
        let unchanged: Testimonial = storage
            .update(&testimonial.id, &TestimonialPatch::default())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(unchanged, testimonial);
    }

    #[tokio::test]
    async fn test_update_rating() {
        let (storage, _clock) = storage_at(utc(2026, 3, 14, 9)).await;
        let testimonial = seed_testimonial(&storage, "Linus", 4).await;

        let patch = TestimonialPatch {
            rating: Some(Rating::new(2).unwrap()),
            verified: Some(true),
            ..Default::default()
        };
        let updated: Testimonial = storage
            .update(&testimonial.id, &patch)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.rating.value(), 2);
        assert!(updated.verified);
    }
}

#[cfg(test)]
mod delete_tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_removes_record() {
        let (storage, _clock) = storage_at(utc(2026, 3, 14, 9)).await;
        let inquiry = seed_inquiry(&storage, "Ada").await;

        assert!(storage.delete::<Inquiry>(&inquiry.id).await.unwrap());
        assert!(storage
            .find_by_id::<Inquiry>(&inquiry.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_record_returns_false() {
        let (storage, _clock) = storage_at(utc(2026, 3, 14, 9)).await;

        assert!(!storage.delete::<Inquiry>("nonexistent-id").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_case_study_detaches_testimonials() {
        let (storage, _clock) = storage_at(utc(2026, 3, 14, 9)).await;
        let study = seed_case_study(&storage, "Checkout", true).await;

        let mut linked = NewTestimonial::new(
            "Margaret",
            "Shipped on time",
            Rating::new(5).unwrap(),
        );
        linked.case_study_id = Some(study.id.clone());
        let testimonial = storage.insert(&linked).await.unwrap();

        assert!(storage.delete::<CaseStudy>(&study.id).await.unwrap());

        let kept: Testimonial = storage
            .find_by_id(&testimonial.id)
            .await
            .unwrap()
            .expect("testimonial should survive");
        assert!(kept.case_study_id.is_none());
    }
}

#[cfg(test)]
mod query_tests {
    use super::*;

    async fn seed_statuses(storage: &SqliteStorage, statuses: &[InquiryStatus]) {
        for (i, status) in statuses.iter().enumerate() {
            let inquiry = seed_inquiry(storage, &format!("Client{}", i)).await;
            let patch = InquiryPatch {
                status: Some(*status),
                ..Default::default()
            };
            storage.update::<Inquiry>(&inquiry.id, &patch).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_count_with_filter() {
        let (storage, _clock) = storage_at(utc(2026, 3, 14, 9)).await;
        seed_statuses(
            &storage,
            &[
                InquiryStatus::New,
                InquiryStatus::Completed,
                InquiryStatus::New,
            ],
        )
        .await;

        let all = storage
            .count::<Inquiry>(&RecordQuery::all())
            .await
            .unwrap();
        let new = storage
            .count::<Inquiry>(&RecordQuery::all().with_filter(InquiryFilter::Status(InquiryStatus::New)))
            .await
            .unwrap();

        assert_eq!(all, 3);
        assert_eq!(new, 2);
    }

    #[tokio::test]
    async fn test_group_count_orders_largest_first() {
        let (storage, _clock) = storage_at(utc(2026, 3, 14, 9)).await;
        seed_statuses(
            &storage,
            &[
                InquiryStatus::New,
                InquiryStatus::InProgress,
                InquiryStatus::New,
                InquiryStatus::InProgress,
                InquiryStatus::New,
            ],
        )
        .await;

        let groups = storage
            .group_count::<Inquiry>(InquiryField::Status, &RecordQuery::all())
            .await
            .unwrap();

        assert_eq!(
            groups,
            vec![GroupCount::new("new", 3), GroupCount::new("in-progress", 2)]
        );
    }

    #[tokio::test]
    async fn test_group_count_on_empty_store() {
        let (storage, _clock) = storage_at(utc(2026, 3, 14, 9)).await;

        let groups = storage
            .group_count::<Inquiry>(InquiryField::ProjectType, &RecordQuery::all())
            .await
            .unwrap();

        assert!(groups.is_empty());
    }

    #[tokio::test]
    async fn test_search_matches_any_search_column_case_insensitively() {
        let (storage, _clock) = storage_at(utc(2026, 3, 14, 9)).await;
        seed_inquiry(&storage, "Ada").await;
        seed_inquiry(&storage, "Grace").await;

        let query = RecordQuery::<InquiryFilter>::all().with_search("GRACE");
        let found: Vec<Inquiry> = storage.find_many(&query, 0, 10).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Grace");
    }

    #[tokio::test]
    async fn test_search_folds_non_ascii_case() {
        let (storage, _clock) = storage_at(utc(2026, 3, 14, 9)).await;
        seed_inquiry(&storage, "ÉLODIE").await;
        seed_inquiry(&storage, "Ada").await;

        for term in ["élodie", "ÉLODIE", "Élo"] {
            let query = RecordQuery::<InquiryFilter>::all().with_search(term);
            let count = storage.count::<Inquiry>(&query).await.unwrap();
            assert_eq!(count, 1, "search {:?}", term);
        }
    }

    #[tokio::test]
    async fn test_search_follows_updated_fields() {
        let (storage, _clock) = storage_at(utc(2026, 3, 14, 9)).await;
        let study = seed_case_study(&storage, "Checkout", true).await;

        let patch = CaseStudyPatch {
            title: Some("ÜRÜN Katalog".to_string()),
            ..Default::default()
        };
        storage
            .update::<CaseStudy>(&study.id, &patch)
            .await
            .unwrap()
            .unwrap();

        for term in ["ürün", "ÜRÜN KATALOG"] {
            let query = RecordQuery::<CaseStudyFilter>::all().with_search(term);
            assert_eq!(storage.count::<CaseStudy>(&query).await.unwrap(), 1, "search {:?}", term);
        }
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let (storage, _clock) = storage_at(utc(2026, 3, 14, 9)).await;
        seed_inquiry(&storage, "Ada").await;

        let query = RecordQuery::<InquiryFilter>::all().with_search("%");
        let count = storage.count::<Inquiry>(&query).await.unwrap();

        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_find_many_newest_first() {
        let (storage, clock) = storage_at(utc(2026, 3, 14, 9)).await;
        let first = seed_inquiry(&storage, "Ada").await;
        clock.advance(Duration::minutes(5));
        let second = seed_inquiry(&storage, "Grace").await;

        let found: Vec<Inquiry> = storage
            .find_many(&RecordQuery::all(), 0, 10)
            .await
            .unwrap();

        let ids: Vec<&str> = found.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
    }

    #[tokio::test]
    async fn test_monthly_counts_ascending_and_sparse() {
        let (storage, clock) = storage_at(utc(2026, 1, 20, 12)).await;
        seed_inquiry(&storage, "January").await;
        clock.set(utc(2026, 3, 2, 12));
        seed_inquiry(&storage, "March").await;
        seed_inquiry(&storage, "March2").await;

        let months = storage
            .monthly_counts::<Inquiry>(&RecordQuery::all(), FixedOffset::east_opt(0).unwrap())
            .await
            .unwrap();

        assert_eq!(
            months,
            vec![
                MonthlyCount { year: 2026, month: 1, count: 1 },
                MonthlyCount { year: 2026, month: 3, count: 2 },
            ]
        );
    }

    #[tokio::test]
    async fn test_monthly_counts_respect_offset() {
        // 23:30 UTC on Jan 31 is already Feb 1 at UTC+1.
        let (storage, _clock) = storage_at(
            chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 31, 23, 30, 0).unwrap(),
        )
        .await;
        seed_inquiry(&storage, "Late").await;

        let months = storage
            .monthly_counts::<Inquiry>(&RecordQuery::all(), FixedOffset::east_opt(3600).unwrap())
            .await
            .unwrap();

        assert_eq!(months, vec![MonthlyCount { year: 2026, month: 2, count: 1 }]);
    }

    #[tokio::test]
    async fn test_created_since_bound_is_inclusive() {
        let (storage, clock) = storage_at(utc(2026, 3, 1, 0)).await;
        seed_inquiry(&storage, "Boundary").await;
        clock.set(utc(2026, 2, 28, 23));
        seed_inquiry(&storage, "Before").await;

        let count = storage
            .count::<Inquiry>(&RecordQuery::all().created_since(utc(2026, 3, 1, 0)))
            .await
            .unwrap();

        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_distinct_values_and_tags() {
        let (storage, _clock) = storage_at(utc(2026, 3, 14, 9)).await;
        let mut study = portfolio_admin::storage::NewCaseStudy::new(
            "Shop",
            "Storefront",
            portfolio_admin::storage::Category::Web,
            portfolio_admin::storage::PlatformType::Pwa,
        );
        study.tags = vec!["retail".to_string(), "".to_string(), "b2c".to_string()];
        storage.insert(&study).await.unwrap();
        seed_case_study(&storage, "Hidden", false).await;

        let public = RecordQuery::all().with_filter(CaseStudyFilter::Public(true));
        let categories = storage
            .distinct_values::<CaseStudy>(CaseStudyField::Category, &public)
            .await
            .unwrap();
        let tags = storage.case_study_tags(&public, 20).await.unwrap();

        assert_eq!(categories, vec!["web"]);
        assert_eq!(tags, vec!["b2c", "retail"]);
    }

    #[tokio::test]
    async fn test_rating_stats() {
        let (storage, _clock) = storage_at(utc(2026, 3, 14, 9)).await;
        seed_testimonial(&storage, "A", 5).await;
        seed_testimonial(&storage, "B", 4).await;
        seed_testimonial(&storage, "C", 4).await;

        let stats = storage
            .rating_stats(&RecordQuery::<TestimonialFilter>::all())
            .await
            .unwrap();

        assert_eq!(stats.total, 3);
        let average = stats.average.unwrap();
        assert!((average - 13.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_rating_stats_empty() {
        let (storage, _clock) = storage_at(utc(2026, 3, 14, 9)).await;

        let stats = storage
            .rating_stats(&RecordQuery::<TestimonialFilter>::all())
            .await
            .unwrap();

        assert_eq!(stats.total, 0);
        assert!(stats.average.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_reads_match_store() {
        let (storage, _clock) = storage_at(utc(2026, 3, 14, 9)).await;
        seed_inquiry(&storage, "Ada").await;

        let snapshot = storage.snapshot().await.unwrap();
        let count = snapshot
            .count::<Inquiry>(&RecordQuery::all().with_filter(InquiryFilter::ProjectType(ProjectType::Web)))
            .await
            .unwrap();
        snapshot.close().await.unwrap();

        assert_eq!(count, 1);
    }
}

#[cfg(test)]
mod file_storage_tests {
    use super::*;
    use portfolio_admin::config::DatabaseConfig;

    #[tokio::test]
    async fn test_file_backed_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("nested").join("portfolio.db"),
            max_connections: 2,
        };

        let id = {
            let storage = SqliteStorage::new(&config).await.unwrap();
            seed_inquiry(&storage, "Persisted").await.id
        };

        let reopened = SqliteStorage::new(&config).await.unwrap();
        let inquiry: Inquiry = reopened.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(inquiry.name, "Persisted");
    }

    #[tokio::test]
    async fn test_concurrent_updates_to_one_record_all_apply() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("portfolio.db"),
            max_connections: 4,
        };
        let storage = SqliteStorage::new(&config).await.unwrap();
        let id = seed_inquiry(&storage, "Contended").await.id;

        let mut tasks = Vec::new();
        for i in 0..40 {
            let storage = storage.clone();
            let id = id.clone();
            tasks.push(tokio::spawn(async move {
                let patch = if i % 2 == 0 {
                    InquiryPatch {
                        status: Some(InquiryStatus::Closed),
                        ..Default::default()
                    }
                } else {
                    InquiryPatch {
                        priority: Some(Priority::Urgent),
                        ..Default::default()
                    }
                };
                storage.update::<Inquiry>(&id, &patch).await
            }));
        }

        for task in tasks {
            let updated = task.await.unwrap().unwrap().unwrap();
            assert_eq!(updated.id, id);
        }

        let inquiry: Inquiry = storage.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(inquiry.status, InquiryStatus::Closed);
        assert_eq!(inquiry.priority, Priority::Urgent);
        assert_eq!(inquiry.name, "Contended");
    }
}
