//! Postgres repository tests
//!
//! Need a reachable database in `DATABASE_URL`.
//! Run with: cargo test --test repository_tests -- --ignored

use chrono::{Duration, NaiveDate};
use sqlx::{postgres::PgPoolOptions, PgPool};

use rentkar::{
    models::{
        borrow_request::{ItemStatusChange, StatusChange},
        CreateItem, ItemFilters, ItemSortField, ItemStatus, NewBorrowRequest, PageRequest,
        RequestFilter, RequestStatus, SortDirection,
    },
    AppError, Repository,
};

async fn setup() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Insert a user with a unique name and return its id
async fn create_user(pool: &PgPool, tag: &str) -> i64 {
    let name = format!("{}_{}", tag, std::process::id());
    sqlx::query_scalar(
        r#"
        INSERT INTO users (username, email) VALUES ($1, $2)
        ON CONFLICT (username) DO UPDATE SET updated_at = NOW()
        RETURNING id
        "#,
    )
    .bind(&name)
    .bind(format!("{}@example.test", name))
    .fetch_one(pool)
    .await
    .expect("Failed to create user")
}

fn create_item(title: &str, description: Option<&str>, category: &str) -> CreateItem {
    CreateItem {
        title: title.to_string(),
        description: description.map(String::from),
        category: Some(category.to_string()),
        image_url: None,
    }
}

#[tokio::test]
#[ignore]
async fn test_item_filters() {
    let pool = setup().await;
    let owner = create_user(&pool, "filters_owner").await;
    let repo = Repository::new(pool);
    let category = format!("lighting-{}", owner);

    let lamp = repo.items.create(owner, &create_item("Desk Lamp", None, &category)).await.unwrap();
    let shade = repo
        .items
        .create(owner, &create_item("Shade", Some("for a LAMP, 50% off"), &category))
        .await
        .unwrap();
    let chair = repo.items.create(owner, &create_item("Chair", None, &category)).await.unwrap();
    repo.items
        .update(
            shade.id,
            &rentkar::models::UpdateItem {
                status: Some(ItemStatus::Borrowed),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let page = PageRequest::new(1, 50).sorted(ItemSortField::Id, SortDirection::Asc);

    let all = repo
        .items
        .find(&ItemFilters { owner_id: Some(owner), ..Default::default() }, &page)
        .await
        .unwrap();
    assert_eq!(all.items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![lamp.id, shade.id, chair.id]);

    let found = repo
        .items
        .find(
            &ItemFilters {
                status: Some(ItemStatus::Available),
                owner_id: Some(owner),
                keyword: Some("lamp".to_string()),
                ..Default::default()
            },
            &page,
        )
        .await
        .unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].id, lamp.id);

    // the keyword is folded by the database, same as the columns
    let upper = repo
        .items
        .find(
            &ItemFilters {
                owner_id: Some(owner),
                keyword: Some("DESK LAMP".to_string()),
                ..Default::default()
            },
            &page,
        )
        .await
        .unwrap();
    assert_eq!(upper.items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![lamp.id]);

    // wildcard characters are matched literally
    let literal = repo
        .items
        .find(
            &ItemFilters {
                owner_id: Some(owner),
                keyword: Some("50%".to_string()),
                ..Default::default()
            },
            &page,
        )
        .await
        .unwrap();
    assert_eq!(literal.items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![shade.id]);

    let by_category = repo.items.find(&ItemFilters::by_category(category.clone()), &page).await.unwrap();
    assert_eq!(by_category.total, 3);
}

#[tokio::test]
#[ignore]
async fn test_request_queries_and_transitions() {
    let pool = setup().await;
    let lender = create_user(&pool, "tx_lender").await;
    let borrower = create_user(&pool, "tx_borrower").await;
    let repo = Repository::new(pool);

    let item = repo.items.create(lender, &create_item("Ladder", None, "Tools")).await.unwrap();
    let borrow = NaiveDate::from_ymd_opt(2030, 6, 1).unwrap();
    let request = repo
        .borrow_requests
        .create(&NewBorrowRequest {
            item_id: item.id,
            borrower_id: borrower,
            lender_id: lender,
            borrow_date: borrow,
            return_date: borrow + Duration::days(2),
            request_message: Some("Weekend project".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(request.status, RequestStatus::Pending);

    let pending = RequestFilter::item(item.id).with_status(RequestStatus::Pending);
    assert_eq!(repo.borrow_requests.count(&pending).await.unwrap(), 1);
    assert_eq!(repo.borrow_requests.find(&RequestFilter::item(item.id)).await.unwrap().len(), 1);

    let approve = StatusChange {
        request_id: request.id,
        expected: RequestStatus::Pending,
        next: RequestStatus::Approved,
        response_message: Some("Enjoy".to_string()),
        item: Some(ItemStatusChange {
            item_id: item.id,
            expected: Some(ItemStatus::Available),
            next: ItemStatus::Borrowed,
        }),
    };
    let approved = repo.borrow_requests.apply_status_change(&approve).await.unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.response_message.as_deref(), Some("Enjoy"));
    assert_eq!(repo.items.get_by_id(item.id).await.unwrap().status, ItemStatus::Borrowed);

    let err = repo.borrow_requests.apply_status_change(&approve).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let returned = repo
        .borrow_requests
        .apply_status_change(&StatusChange {
            request_id: request.id,
            expected: RequestStatus::Approved,
            next: RequestStatus::Returned,
            response_message: None,
            item: Some(ItemStatusChange {
                item_id: item.id,
                expected: None,
                next: ItemStatus::Available,
            }),
        })
        .await
        .unwrap();
    assert!(returned.returned_at.is_some());
    assert_eq!(returned.response_message.as_deref(), Some("Enjoy"));

    let err = repo.borrow_requests.delete_pending(request.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    repo.items.delete(item.id).await.unwrap();
    assert!(matches!(repo.borrow_requests.get_by_id(request.id).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
#[ignore]
async fn test_same_day_return_rejected_by_schema() {
    let pool = setup().await;
    let lender = create_user(&pool, "chk_lender").await;
    let borrower = create_user(&pool, "chk_borrower").await;
    let repo = Repository::new(pool);

    let item = repo.items.create(lender, &create_item("Kayak", None, "Outdoor")).await.unwrap();
    let day = NaiveDate::from_ymd_opt(2030, 6, 1).unwrap();
    let err = repo
        .borrow_requests
        .create(&NewBorrowRequest {
            item_id: item.id,
            borrower_id: borrower,
            lender_id: lender,
            borrow_date: day,
            return_date: day,
            request_message: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Database(_)));

    repo.items.delete(item.id).await.unwrap();
}
