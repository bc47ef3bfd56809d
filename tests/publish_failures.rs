//! A write whose event cannot be published must not be kept

mod common;

use async_trait::async_trait;
use mockall::{mock, predicate::eq};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

use common::{MemoryAdminStore, MemoryBroker, MemoryFrontendStore};
use library_services::{
    error::{AppError, AppResult},
    events::{EventPublisher, Topic},
    models::{BorrowRequest, CreateBook, CreateUser, NewBook, UpdateUser},
    services::{AdminServices, FrontendServices},
};

mock! {
    pub Publisher {}

    #[async_trait]
    impl EventPublisher for Publisher {
        async fn publish(&self, topic: Topic, payload: String) -> AppResult<()>;
    }
}

fn broker_down() -> MockPublisher {
    let mut publisher = MockPublisher::new();
    publisher
        .expect_publish()
        .returning(|_, _| Err(AppError::Broker("connection refused".to_string())));
    publisher
}

fn dune() -> CreateBook {
    CreateBook {
        title: "Dune".to_string(),
        publisher: "Ace".to_string(),
        category: "SciFi".to_string(),
    }
}

fn ada() -> CreateUser {
    CreateUser {
        email: "a@b.com".to_string(),
        firstname: "Ada".to_string(),
        lastname: "Lovelace".to_string(),
    }
}

#[tokio::test]
async fn test_add_book_rolls_back_when_publish_fails() {
    let store = MemoryAdminStore::default();
    let services = AdminServices::new(Arc::new(store.clone()), Arc::new(broker_down()));

    let err = assert_err!(services.inventory.add_book(dune()).await);
    assert!(matches!(err, AppError::Broker(_)));
    assert!(store.snapshot().books.is_empty());
}

#[tokio::test]
async fn test_add_book_publishes_exactly_once() {
    let mut publisher = MockPublisher::new();
    publisher
        .expect_publish()
        .with(
            eq(Topic::BookAdded),
            eq(r#"[{"id":1,"title":"dune","publisher":"ace","category":"scifi"}]"#.to_string()),
        )
        .times(1)
        .returning(|_, _| Ok(()));

    let store = MemoryAdminStore::default();
    let services = AdminServices::new(Arc::new(store.clone()), Arc::new(publisher));
    assert_ok!(services.inventory.add_book(dune()).await);
    assert_eq!(store.snapshot().books.len(), 1);
}

#[tokio::test]
async fn test_sign_up_rolls_back_when_publish_fails() {
    let store = MemoryFrontendStore::default();
    let services = FrontendServices::new(Arc::new(store.clone()), Arc::new(broker_down()));

    assert_err!(services.accounts.create_user(ada()).await);
    assert!(store.snapshot().users.is_empty());
}

#[tokio::test]
async fn test_user_update_rolls_back_when_publish_fails() {
    let store = MemoryFrontendStore::default();
    let working = FrontendServices::new(Arc::new(store.clone()), Arc::new(MemoryBroker::default()));
    let user = assert_ok!(working.accounts.create_user(ada()).await);

    let failing = FrontendServices::new(Arc::new(store.clone()), Arc::new(broker_down()));
    let changes = UpdateUser {
        lastname: Some("King".to_string()),
        ..UpdateUser::default()
    };
    assert_err!(failing.accounts.update_user(user.id, changes).await);
    assert_eq!(store.snapshot().users[0].lastname, "Lovelace");
}

#[tokio::test]
async fn test_borrow_rolls_back_when_publish_fails() {
    let store = MemoryFrontendStore::default();
    let working = FrontendServices::new(Arc::new(store.clone()), Arc::new(MemoryBroker::default()));
    let user = assert_ok!(working.accounts.create_user(ada()).await);
    let book = assert_ok!(
        working
            .catalog
            .add_book(NewBook {
                title: "dune".to_string(),
                publisher: "ace".to_string(),
                category: "scifi".to_string(),
            })
            .await
    );

    let failing = FrontendServices::new(Arc::new(store.clone()), Arc::new(broker_down()));
    let request = BorrowRequest {
        user_id: user.id,
        borrow_duration_days: 3,
    };
    assert_err!(failing.catalog.borrow(book.id, request).await);
    assert!(!store.book("dune").unwrap().is_borrowed);
}

#[tokio::test]
async fn test_remove_and_return_roll_back_when_publish_fails() {
    let store = MemoryAdminStore::default();
    let working = AdminServices::new(Arc::new(store.clone()), Arc::new(MemoryBroker::default()));
    let book = assert_ok!(working.inventory.add_book(dune()).await);

    let failing = AdminServices::new(Arc::new(store.clone()), Arc::new(broker_down()));
    assert_err!(failing.inventory.remove_book(book.id).await);
    assert_eq!(store.snapshot().books.len(), 1);

    let today = chrono::Utc::now().date_naive();
    let user = assert_ok!(
        working
            .members
            .add_user(library_services::models::NewUser {
                email: "a@b.com".to_string(),
                firstname: "Ada".to_string(),
                lastname: "Lovelace".to_string(),
                joined_on: chrono::Utc::now(),
            })
            .await
    );
    let entry = assert_ok!(working.inventory.borrow_book("dune", &user.email, 3, today).await);

    assert_err!(failing.inventory.return_entry(entry.id).await);
    assert!(!store.snapshot().entries[0].is_returned);
}
