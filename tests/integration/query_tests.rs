//! Query service tests over the in-memory store

use chrono::{Duration, NaiveDate, Utc};
use tokio_test::{assert_err, assert_ok};

use rentkar::{
    config::PaginationConfig,
    models::{
        BorrowRequest, CreateBorrowRequest, Item, ItemFilters, ItemSortField, ItemStatus,
        PageQuery, PageRequest, RequestStatus, SortDirection,
    },
    repository::memory::MemoryStore,
    validation, AppError, Repository, Services,
};

fn item(id: i64, owner_id: i64, title: &str, status: ItemStatus) -> Item {
    let created = Utc::now() - Duration::minutes(100 - id);
    Item {
        id,
        owner_id,
        title: title.to_string(),
        description: None,
        category: Some("Home".to_string()),
        image_url: None,
        status,
        created_at: created,
        updated_at: created,
    }
}

fn request(id: i64, item_id: i64, borrower_id: i64, lender_id: i64, status: RequestStatus) -> BorrowRequest {
    let borrow = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
    let created = Utc::now() - Duration::minutes(100 - id);
    BorrowRequest {
        id,
        item_id,
        borrower_id,
        lender_id,
        status,
        request_message: None,
        response_message: None,
        borrow_date: borrow,
        return_date: borrow + Duration::days(7),
        returned_at: None,
        completed_at: None,
        created_at: created,
        updated_at: created,
    }
}

async fn services(store: &MemoryStore) -> Services {
    Services::new(Repository::from_memory(store.clone()), PaginationConfig::default())
}

#[tokio::test]
async fn test_lamp_example() {
    let store = MemoryStore::new();
    store.insert_item(item(1, 1, "Desk Lamp", ItemStatus::Available)).await;
    store.insert_item(item(2, 1, "Lamp Shade", ItemStatus::Borrowed)).await;
    store.insert_item(item(3, 1, "Chair", ItemStatus::Available)).await;
    let services = services(&store).await;

    let page = services
        .catalog
        .find_items_with_filters(
            Some(ItemStatus::Available),
            None,
            Some("lamp".to_string()),
            &PageRequest::new(1, 10),
        )
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].title, "Desk Lamp");
}

#[tokio::test]
async fn test_unfiltered_pages_walk_the_whole_catalog() {
    let store = MemoryStore::new();
    for id in 1..=7 {
        store.insert_item(item(id, 1, &format!("Item {}", id), ItemStatus::Available)).await;
    }
    let services = services(&store).await;
    let catalog = &services.catalog;

    let mut seen = Vec::new();
    let mut request = catalog.page_request(&PageQuery {
        per_page: Some(3),
        sort: Some(ItemSortField::CreatedAt),
        direction: Some(SortDirection::Asc),
        ..Default::default()
    });
    loop {
        let page = catalog.find_items_with_filters(None, None, None, &request).await.unwrap();
        assert_eq!(page.total, 7);
        assert_eq!(page.total_pages, 3);
        seen.extend(page.items.iter().map(|i| i.id));
        if !page.has_next() {
            break;
        }
        request.page += 1;
    }
    assert_eq!(seen, (1..=7).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_newest_first_by_default() {
    let store = MemoryStore::new();
    for id in 1..=3 {
        store.insert_item(item(id, 1, "Thing", ItemStatus::Available)).await;
    }
    let services = services(&store).await;
    let request = services.catalog.page_request(&PageQuery::default());
    let page = services.catalog.browse(ItemFilters::default(), &request).await.unwrap();
    let ids: Vec<i64> = page.items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![3, 2, 1]);
}

#[tokio::test]
async fn test_pending_count_for_zero_one_and_many() {
    let store = MemoryStore::new();
    let services = services(&store).await;
    let requests = &services.borrow_requests;

    assert_eq!(requests.count_pending_for_lender(1).await.unwrap(), 0);

    store.insert_request(request(1, 10, 5, 1, RequestStatus::Pending)).await;
    store.insert_request(request(2, 10, 6, 1, RequestStatus::Approved)).await;
    store.insert_request(request(3, 11, 7, 2, RequestStatus::Pending)).await;
    assert_eq!(requests.count_pending_for_lender(1).await.unwrap(), 1);

    store.insert_request(request(4, 12, 8, 1, RequestStatus::Pending)).await;
    store.insert_request(request(5, 13, 9, 1, RequestStatus::Pending)).await;
    assert_eq!(requests.count_pending_for_lender(1).await.unwrap(), 3);
    assert_eq!(requests.count_pending_for_lender(2).await.unwrap(), 1);
}

#[tokio::test]
async fn test_request_lookups() {
    let store = MemoryStore::new();
    store.insert_request(request(1, 10, 5, 1, RequestStatus::Pending)).await;
    store.insert_request(request(2, 10, 6, 1, RequestStatus::Rejected)).await;
    store.insert_request(request(3, 11, 5, 2, RequestStatus::Completed)).await;
    let services = services(&store).await;
    let requests = &services.borrow_requests;

    let by_borrower: Vec<i64> = requests.requests_by_borrower(5).await.unwrap().iter().map(|r| r.id).collect();
    assert_eq!(by_borrower, vec![3, 1]);
    assert_eq!(requests.requests_by_lender(1).await.unwrap().len(), 2);
    assert_eq!(requests.requests_by_item(10).await.unwrap().len(), 2);
    assert_eq!(
        requests
            .requests_by_borrower_and_status(5, RequestStatus::Completed)
            .await
            .unwrap()[0]
            .id,
        3
    );
    assert_eq!(
        requests
            .requests_by_lender_and_status(1, RequestStatus::Rejected)
            .await
            .unwrap()[0]
            .id,
        2
    );
    assert_eq!(requests.count_by_borrower_and_status(5, RequestStatus::Pending).await.unwrap(), 1);
    assert_eq!(requests.count_by_lender_and_status(2, RequestStatus::Completed).await.unwrap(), 1);
    assert!(requests.requests_by_borrower(404).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_request_is_not_found() {
    let services = services(&MemoryStore::new()).await;
    let err = assert_err!(services.borrow_requests.get_request(1, 1).await);
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_create_request_against_local_today() {
    let store = MemoryStore::new();
    store.insert_item(item(1, 1, "Ladder", ItemStatus::Available)).await;
    let services = services(&store).await;
    let today = validation::today();

    let created = assert_ok!(
        services
            .borrow_requests
            .create_request(
                1,
                CreateBorrowRequest {
                    borrow_date: Some(today),
                    return_date: Some(today + Duration::days(1)),
                    request_message: None,
                },
                2,
            )
            .await
    );
    assert_eq!(created.status, RequestStatus::Pending);

    assert_err!(
        services
            .borrow_requests
            .create_request(
                1,
                CreateBorrowRequest {
                    borrow_date: Some(today - Duration::days(1)),
                    return_date: Some(today + Duration::days(1)),
                    request_message: None,
                },
                2,
            )
            .await
    );
}

#[tokio::test]
async fn test_page_past_the_end_is_empty() {
    let store = MemoryStore::new();
    store.insert_item(item(1, 1, "Desk Lamp", ItemStatus::Available)).await;
    let services = services(&store).await;
    let catalog = &services.catalog;

    let request = catalog.page_request(&PageQuery {
        page: Some(i64::MAX),
        ..Default::default()
    });
    let page = assert_ok!(catalog.search_items("", &request).await);
    assert!(page.items.is_empty());
    assert_eq!(page.total, 1);
    assert!(!page.has_next());

    let browsed = assert_ok!(catalog.browse(ItemFilters::default(), &request).await);
    assert!(browsed.items.is_empty());
}
