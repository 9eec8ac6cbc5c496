//! Reference data tests
//!
//! Companies, products and order bookers: search and sort filters, partial
//! updates, reference checks and delete guards.

mod common;

use booker_ledger::services::company::{CompanyFilters, CreateCompanyInput, UpdateCompanyInput};
use booker_ledger::services::daily_entry::{CreateDailyEntryInput, DailyEntryItemInput};
use booker_ledger::services::order_booker::{
    CreateOrderBookerInput, OrderBookerFilters, UpdateOrderBookerInput,
};
use booker_ledger::services::product::{
    CreateProductInput, ProductFilters, ProductSort, UpdateProductInput,
};
use booker_ledger::{AppError, Ledger};
use chrono::NaiveDate;
use common::{company, date, dec, ledger, product, seed};
use shared::{DateRange, OrderBooker, SortOrder};

async fn booker_with(ledger: &Ledger, name: &str, name_urdu: &str, phone: &str, joined: NaiveDate) -> OrderBooker {
    ledger
        .order_bookers
        .create(CreateOrderBookerInput {
            name: name.to_string(),
            name_urdu: name_urdu.to_string(),
            phone: phone.to_string(),
            email: None,
            join_date: Some(joined),
            is_active: None,
        })
        .await
        .unwrap()
}

fn names<T>(rows: &[T], name: impl Fn(&T) -> &str) -> Vec<String> {
    rows.iter().map(|r| name(r).to_string()).collect()
}

// ============================================================================
// Companies
// ============================================================================

#[cfg(test)]
mod company_tests {
    use super::*;

    #[tokio::test]
    async fn search_matches_name_address_and_email() {
        let ledger = ledger().await;
        company(&ledger, "National Foods").await;
        ledger
            .companies
            .create(CreateCompanyInput {
                name: "Shan Foods".to_string(),
                address: Some("Korangi, Karachi".to_string()),
                email: Some("orders@shan.pk".to_string()),
                phone: None,
            })
            .await
            .unwrap();

        let search = |term: &str| CompanyFilters {
            search: Some(term.to_string()),
        };
        let all = ledger.companies.list(&CompanyFilters::default()).await.unwrap();
        assert_eq!(names(&all, |c| c.name.as_str()), ["National Foods", "Shan Foods"]);

        let by_name = ledger.companies.list(&search("Shan")).await.unwrap();
        assert_eq!(names(&by_name, |c| c.name.as_str()), ["Shan Foods"]);
        let by_address = ledger.companies.list(&search("Lahore")).await.unwrap();
        assert_eq!(names(&by_address, |c| c.name.as_str()), ["National Foods"]);
        let by_email = ledger.companies.list(&search("orders@")).await.unwrap();
        assert_eq!(names(&by_email, |c| c.name.as_str()), ["Shan Foods"]);

        assert_eq!(ledger.companies.list(&search("Foods")).await.unwrap().len(), 2);
        assert_eq!(ledger.companies.list(&search("   ")).await.unwrap().len(), 2);
        assert!(ledger.companies.list(&search("Nestle")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_touches_only_supplied_fields() {
        let ledger = ledger().await;
        let id = company(&ledger, "National Foods").await;

        let updated = ledger
            .companies
            .update(
                &id,
                UpdateCompanyInput {
                    phone: Some("042-111-000-111".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "National Foods");
        assert_eq!(updated.address.as_deref(), Some("Mall Road, Lahore"));
        assert_eq!(updated.phone.as_deref(), Some("042-111-000-111"));

        let renamed = ledger
            .companies
            .update(
                &id,
                UpdateCompanyInput {
                    name: Some("  National Foods Ltd  ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "National Foods Ltd");
        assert_eq!(renamed.phone.as_deref(), Some("042-111-000-111"));
    }

    #[tokio::test]
    async fn invalid_updates_are_rejected() {
        let ledger = ledger().await;
        let id = company(&ledger, "National Foods").await;

        let blank = ledger
            .companies
            .update(
                &id,
                UpdateCompanyInput {
                    name: Some("   ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(blank, AppError::Validation { .. }));

        let email = ledger
            .companies
            .update(
                &id,
                UpdateCompanyInput {
                    email: Some("not-an-email".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(email, AppError::Validation { .. }));

        let missing = ledger
            .companies
            .update("missing", UpdateCompanyInput::default())
            .await
            .unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn company_with_products_cannot_be_deleted() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;

        let err = ledger.companies.delete(&seed.company_id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));

        ledger.products.delete(&seed.product.id).await.unwrap();
        ledger.companies.delete(&seed.company_id).await.unwrap();
        assert!(ledger.companies.get_by_id(&seed.company_id).await.unwrap().is_none());

        let err = ledger.companies.delete(&seed.company_id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}

// ============================================================================
// Products
// ============================================================================

#[cfg(test)]
mod product_tests {
    use super::*;

    #[tokio::test]
    async fn unknown_company_is_a_reference_error() {
        let ledger = ledger().await;

        let err = ledger
            .products
            .create(CreateProductInput {
                company_id: "no-such-company".to_string(),
                name: "Orphan".to_string(),
                cost_price: dec(10),
                sell_price: dec(12),
                unit_per_carton: 6,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ReferenceNotFound { entity: "company", .. }));
        assert!(ledger.products.list(&ProductFilters::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn carton_size_and_prices_are_checked() {
        let ledger = ledger().await;
        let company_id = company(&ledger, "National Foods").await;
        let input = CreateProductInput {
            company_id: company_id.clone(),
            name: "Ketchup".to_string(),
            cost_price: dec(100),
            sell_price: dec(150),
            unit_per_carton: 0,
        };

        let err = ledger.products.create(input.clone()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "unit_per_carton"));

        let err = ledger
            .products
            .create(CreateProductInput {
                unit_per_carton: 12,
                cost_price: dec(-1),
                ..input.clone()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "cost_price"));

        let err = ledger
            .products
            .create(CreateProductInput {
                unit_per_carton: 12,
                name: "  ".to_string(),
                ..input
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn list_filters_and_sorts() {
        let ledger = ledger().await;
        let national = company(&ledger, "National Foods").await;
        let shan = company(&ledger, "Shan Foods").await;
        product(&ledger, &national, "P1", 100, 150, 24).await;
        product(&ledger, &national, "Biscuit", 50, 80, 12).await;
        product(&ledger, &shan, "Chips", 30, 40, 48).await;

        let by_name = ledger.products.list(&ProductFilters::default()).await.unwrap();
        assert_eq!(names(&by_name, |p| p.name.as_str()), ["Biscuit", "Chips", "P1"]);

        let by_price = ledger
            .products
            .list(&ProductFilters {
                sort_by: ProductSort::SellPrice,
                sort_order: Some(SortOrder::Desc),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(names(&by_price, |p| p.name.as_str()), ["P1", "Biscuit", "Chips"]);

        let by_carton = ledger
            .products
            .list(&ProductFilters {
                sort_by: ProductSort::UnitPerCarton,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(names(&by_carton, |p| p.name.as_str()), ["Biscuit", "P1", "Chips"]);

        let national_only = ledger
            .products
            .list(&ProductFilters {
                company_id: Some(national.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(names(&national_only, |p| p.name.as_str()), ["Biscuit", "P1"]);

        let searched = ledger
            .products
            .list(&ProductFilters {
                search: Some("Chi".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(names(&searched, |p| p.name.as_str()), ["Chips"]);

        assert_eq!(ledger.products.list_by_company(&shan).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_moves_and_reprices() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;
        let shan = company(&ledger, "Shan Foods").await;

        let moved = ledger
            .products
            .update(
                &seed.product.id,
                UpdateProductInput {
                    company_id: Some(shan.clone()),
                    sell_price: Some(dec(160)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.company_id, shan);
        assert_eq!(moved.sell_price, dec(160));
        assert_eq!(moved.cost_price, dec(100));
        assert_eq!(moved.unit_per_carton, 24);

        let err = ledger
            .products
            .update(
                &seed.product.id,
                UpdateProductInput {
                    company_id: Some("no-such-company".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ReferenceNotFound { entity: "company", .. }));

        let err = ledger
            .products
            .update(
                &seed.product.id,
                UpdateProductInput {
                    unit_per_carton: Some(0),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let unchanged = ledger.products.get_by_id(&seed.product.id).await.unwrap().unwrap();
        assert_eq!(unchanged.company_id, shan);
        assert_eq!(unchanged.unit_per_carton, 24);
    }

    #[tokio::test]
    async fn product_on_an_entry_line_cannot_be_deleted() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;
        ledger
            .daily_entries
            .create(CreateDailyEntryInput {
                order_booker_id: seed.booker.id.clone(),
                date: date(2024, 3, 1),
                notes: None,
                items: vec![DailyEntryItemInput {
                    product_id: seed.product.id.clone(),
                    quantity_sold: 5,
                    quantity_returned: 0,
                    cost_price_override: None,
                    sell_price_override: None,
                }],
            })
            .await
            .unwrap();

        let err = ledger.products.delete(&seed.product.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
        let err = ledger.products.delete("missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}

// ============================================================================
// Order bookers
// ============================================================================

#[cfg(test)]
mod order_booker_tests {
    use super::*;

    #[tokio::test]
    async fn search_matches_name_urdu_name_and_phone() {
        let ledger = ledger().await;
        booker_with(&ledger, "Ahmed", "احمد", "0321-5550000", date(2024, 1, 1)).await;
        booker_with(&ledger, "Bilal", "بلال", "0333-1112222", date(2024, 6, 15)).await;

        let search = |term: &str| OrderBookerFilters {
            search: Some(term.to_string()),
            ..Default::default()
        };
        let by_name = ledger.order_bookers.list(&search("Ahm")).await.unwrap();
        assert_eq!(names(&by_name, |b| b.name.as_str()), ["Ahmed"]);
        let by_urdu = ledger.order_bookers.list(&search("بلال")).await.unwrap();
        assert_eq!(names(&by_urdu, |b| b.name.as_str()), ["Bilal"]);
        let by_phone = ledger.order_bookers.list(&search("0321")).await.unwrap();
        assert_eq!(names(&by_phone, |b| b.name.as_str()), ["Ahmed"]);
    }

    #[tokio::test]
    async fn join_date_window_filters_bookers() {
        let ledger = ledger().await;
        booker_with(&ledger, "Ahmed", "احمد", "0321-5550000", date(2024, 1, 1)).await;
        booker_with(&ledger, "Bilal", "بلال", "0333-1112222", date(2024, 6, 15)).await;

        let june = ledger
            .order_bookers
            .list(&OrderBookerFilters {
                join_date: Some(DateRange::new(date(2024, 6, 1), date(2024, 6, 30))),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(names(&june, |b| b.name.as_str()), ["Bilal"]);

        let boundary = ledger
            .order_bookers
            .list(&OrderBookerFilters {
                join_date: Some(DateRange::new(date(2024, 1, 1), date(2024, 6, 15))),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(boundary.len(), 2);
    }

    #[tokio::test]
    async fn deactivate_and_activate_round_trip() {
        let ledger = ledger().await;
        let ahmed = booker_with(&ledger, "Ahmed", "احمد", "0321-5550000", date(2024, 1, 1)).await;
        booker_with(&ledger, "Bilal", "بلال", "0333-1112222", date(2024, 6, 15)).await;
        assert!(ahmed.is_active);

        let inactive = ledger.order_bookers.deactivate(&ahmed.id).await.unwrap();
        assert!(!inactive.is_active);
        assert_eq!(inactive.name, "Ahmed");

        let active_only = OrderBookerFilters {
            is_active: Some(true),
            ..Default::default()
        };
        let listed = ledger.order_bookers.list(&active_only).await.unwrap();
        assert_eq!(names(&listed, |b| b.name.as_str()), ["Bilal"]);
        let retired = ledger
            .order_bookers
            .list(&OrderBookerFilters {
                is_active: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(names(&retired, |b| b.name.as_str()), ["Ahmed"]);

        let active = ledger.order_bookers.activate(&ahmed.id).await.unwrap();
        assert!(active.is_active);
        assert_eq!(ledger.order_bookers.list(&active_only).await.unwrap().len(), 2);

        let err = ledger.order_bookers.deactivate("missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn phone_is_checked_on_create_and_update() {
        let ledger = ledger().await;
        let err = ledger
            .order_bookers
            .create(CreateOrderBookerInput {
                name: "Ahmed".to_string(),
                name_urdu: "احمد".to_string(),
                phone: "12345".to_string(),
                email: None,
                join_date: None,
                is_active: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "phone"));

        let ahmed = booker_with(&ledger, "Ahmed", "احمد", "0321-5550000", date(2024, 1, 1)).await;
        let err = ledger
            .order_bookers
            .update(
                &ahmed.id,
                UpdateOrderBookerInput {
                    phone: Some("0400".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let updated = ledger
            .order_bookers
            .update(
                &ahmed.id,
                UpdateOrderBookerInput {
                    phone: Some("+92 300 7654321".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.phone, "+92 300 7654321");
        assert_eq!(updated.join_date, date(2024, 1, 1));
    }

    #[tokio::test]
    async fn delete_cascades_to_entries() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;
        let entry = ledger
            .daily_entries
            .create(CreateDailyEntryInput {
                order_booker_id: seed.booker.id.clone(),
                date: date(2024, 3, 1),
                notes: None,
                items: vec![DailyEntryItemInput {
                    product_id: seed.product.id.clone(),
                    quantity_sold: 5,
                    quantity_returned: 0,
                    cost_price_override: None,
                    sell_price_override: None,
                }],
            })
            .await
            .unwrap();

        ledger.order_bookers.delete(&seed.booker.id).await.unwrap();
        assert!(ledger.order_bookers.get_by_id(&seed.booker.id).await.unwrap().is_none());
        assert!(ledger.daily_entries.get_by_id(&entry.entry.id).await.unwrap().is_none());

        let err = ledger.order_bookers.delete(&seed.booker.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
