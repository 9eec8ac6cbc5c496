//! Ledger write-path tests
//!
//! Daily entries and orders against an in-memory database:
//! - line and header arithmetic on create
//! - all-or-nothing composite writes
//! - header totals re-derived after item mutations

mod common;

use booker_ledger::notify::order_booker_key;
use booker_ledger::services::daily_entry::{
    CreateDailyEntryInput, DailyEntryFilters, DailyEntryItemInput, UpdateDailyEntryInput,
};
use booker_ledger::services::order::{
    CreateOrderInput, OrderFilters, OrderItemInput, UpdateOrderInput,
};
use booker_ledger::services::product::UpdateProductInput;
use booker_ledger::AppError;
use common::{booker, date, dec, ledger, seed};
use rust_decimal::Decimal;
use shared::OrderStatus;

fn entry_item(product_id: &str, sold: i64, returned: i64) -> DailyEntryItemInput {
    DailyEntryItemInput {
        product_id: product_id.to_string(),
        quantity_sold: sold,
        quantity_returned: returned,
        cost_price_override: None,
        sell_price_override: None,
    }
}

fn order_item(product_id: &str, quantity: i64, return_quantity: i64) -> OrderItemInput {
    OrderItemInput {
        product_id: product_id.to_string(),
        quantity,
        cost_price: Some(dec(100)),
        sell_price: Some(dec(150)),
        return_quantity,
    }
}

async fn count(ledger: &booker_ledger::Ledger, table: &str) -> i64 {
    let pool = ledger.db.connection().unwrap();
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(&pool)
        .await
        .unwrap()
}

// ============================================================================
// Daily entries
// ============================================================================

#[cfg(test)]
mod daily_entry_tests {
    use super::*;

    #[tokio::test]
    async fn create_prices_lines_on_net_quantity() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;

        let created = ledger
            .daily_entries
            .create(CreateDailyEntryInput {
                order_booker_id: seed.booker.id.clone(),
                date: date(2024, 3, 1),
                notes: None,
                items: vec![entry_item(&seed.product.id, 120, 20)],
            })
            .await
            .unwrap();

        let item = &created.items[0];
        assert_eq!(item.net_quantity, 100);
        assert_eq!(item.total_cost, dec(10_000));
        assert_eq!(item.total_revenue, dec(15_000));

        assert_eq!(created.entry.total_amount, dec(18_000));
        assert_eq!(created.entry.total_return_amount, dec(3_000));
        assert_eq!(created.entry.net_amount, dec(15_000));
    }

    #[tokio::test]
    async fn price_overrides_win_over_product_prices() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;

        let created = ledger
            .daily_entries
            .create(CreateDailyEntryInput {
                order_booker_id: seed.booker.id.clone(),
                date: date(2024, 3, 2),
                notes: Some("festival rate".to_string()),
                items: vec![DailyEntryItemInput {
                    sell_price_override: Some(dec(140)),
                    ..entry_item(&seed.product.id, 10, 0)
                }],
            })
            .await
            .unwrap();

        assert_eq!(created.items[0].sell_price_override, Some(dec(140)));
        assert_eq!(created.entry.total_amount, dec(1_400));
        assert_eq!(created.entry.net_amount, dec(1_400));
    }

    #[tokio::test]
    async fn get_by_id_is_stable_and_missing_is_none() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;
        let created = ledger
            .daily_entries
            .create(CreateDailyEntryInput {
                order_booker_id: seed.booker.id.clone(),
                date: date(2024, 3, 1),
                notes: None,
                items: vec![entry_item(&seed.product.id, 5, 1)],
            })
            .await
            .unwrap();

        let first = ledger.daily_entries.get_by_id(&created.entry.id).await.unwrap();
        let second = ledger.daily_entries.get_by_id(&created.entry.id).await.unwrap();
        assert_eq!(first, second);
        assert!(ledger.daily_entries.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_booker_is_a_reference_error() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;

        let err = ledger
            .daily_entries
            .create(CreateDailyEntryInput {
                order_booker_id: "nobody".to_string(),
                date: date(2024, 3, 1),
                notes: None,
                items: vec![entry_item(&seed.product.id, 5, 0)],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ReferenceNotFound { entity: "order booker", .. }));
        assert_eq!(count(&ledger, "daily_entries").await, 0);
    }

    #[tokio::test]
    async fn returns_above_sold_are_rejected() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;

        let err = ledger
            .daily_entries
            .create(CreateDailyEntryInput {
                order_booker_id: seed.booker.id.clone(),
                date: date(2024, 3, 1),
                notes: None,
                items: vec![entry_item(&seed.product.id, 5, 6)],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn update_replaces_items_and_notes_only_touch_notes() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;
        let created = ledger
            .daily_entries
            .create(CreateDailyEntryInput {
                order_booker_id: seed.booker.id.clone(),
                date: date(2024, 3, 1),
                notes: None,
                items: vec![entry_item(&seed.product.id, 10, 0)],
            })
            .await
            .unwrap();
        let id = created.entry.id.clone();

        let noted = ledger
            .daily_entries
            .update(
                &id,
                UpdateDailyEntryInput {
                    notes: Some("late delivery".to_string()),
                    items: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(noted.entry.notes.as_deref(), Some("late delivery"));
        assert_eq!(noted.entry.net_amount, dec(1_500));
        assert_eq!(noted.items, created.items);

        let replaced = ledger
            .daily_entries
            .update(
                &id,
                UpdateDailyEntryInput {
                    notes: None,
                    items: Some(vec![
                        entry_item(&seed.product.id, 4, 0),
                        entry_item(&seed.product.id, 2, 2),
                    ]),
                },
            )
            .await
            .unwrap();
        assert_eq!(replaced.items.len(), 2);
        assert_eq!(replaced.entry.total_amount, dec(900));
        assert_eq!(replaced.entry.total_return_amount, dec(300));
        assert_eq!(replaced.entry.net_amount, dec(600));
        assert_eq!(count(&ledger, "daily_entry_items").await, 2);
    }

    #[tokio::test]
    async fn item_return_adjusts_header_by_delta() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;
        let created = ledger
            .daily_entries
            .create(CreateDailyEntryInput {
                order_booker_id: seed.booker.id.clone(),
                date: date(2024, 3, 1),
                notes: None,
                items: vec![
                    entry_item(&seed.product.id, 10, 0),
                    entry_item(&seed.product.id, 6, 1),
                ],
            })
            .await
            .unwrap();
        let target = &created.items[0];

        let item = ledger
            .daily_entries
            .update_item_return(&target.id, 4)
            .await
            .unwrap();
        assert_eq!(item.net_quantity, 6);
        assert_eq!(item.total_revenue, dec(900));

        let entry = ledger.daily_entries.get_by_id(&created.entry.id).await.unwrap().unwrap();
        assert_eq!(entry.total_amount, dec(2_400));
        assert_eq!(entry.total_return_amount, dec(750));
        assert_eq!(entry.net_amount, entry.total_amount - entry.total_return_amount);

        let err = ledger
            .daily_entries
            .update_item_return(&target.id, 11)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn item_return_after_price_change_uses_recorded_prices() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;
        let created = ledger
            .daily_entries
            .create(CreateDailyEntryInput {
                order_booker_id: seed.booker.id.clone(),
                date: date(2024, 3, 1),
                notes: None,
                items: vec![
                    entry_item(&seed.product.id, 10, 0),
                    DailyEntryItemInput {
                        sell_price_override: Some(dec(140)),
                        ..entry_item(&seed.product.id, 5, 0)
                    },
                ],
            })
            .await
            .unwrap();
        assert_eq!(created.items[0].cost_price, dec(100));
        assert_eq!(created.items[0].sell_price, dec(150));
        assert_eq!(created.items[1].sell_price, dec(140));

        ledger
            .products
            .update(
                &seed.product.id,
                UpdateProductInput {
                    cost_price: Some(dec(120)),
                    sell_price: Some(dec(200)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let item = ledger
            .daily_entries
            .update_item_return(&created.items[0].id, 4)
            .await
            .unwrap();
        assert_eq!(item.sell_price, dec(150));
        assert_eq!(item.total_revenue, dec(900));
        assert_eq!(item.total_cost, dec(600));
        ledger
            .daily_entries
            .update_item_return(&created.items[1].id, 1)
            .await
            .unwrap();

        let stored = ledger
            .daily_entries
            .get_with_items(&created.entry.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.entry.total_amount, dec(2_200));
        assert_eq!(stored.entry.total_return_amount, dec(740));
        assert_eq!(stored.entry.net_amount, dec(1_460));
        let revenue: Decimal = stored.items.iter().map(|i| i.total_revenue).sum();
        assert_eq!(stored.entry.net_amount, revenue);
    }

    #[tokio::test]
    async fn delete_removes_items_and_missing_is_not_found() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;
        let created = ledger
            .daily_entries
            .create(CreateDailyEntryInput {
                order_booker_id: seed.booker.id.clone(),
                date: date(2024, 3, 1),
                notes: None,
                items: vec![entry_item(&seed.product.id, 3, 0)],
            })
            .await
            .unwrap();

        ledger.daily_entries.delete(&created.entry.id).await.unwrap();
        assert_eq!(count(&ledger, "daily_entry_items").await, 0);

        let err = ledger.daily_entries.delete(&created.entry.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn month_filter_uses_calendar_bounds() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;
        for day in [date(2024, 2, 29), date(2024, 3, 1), date(2024, 3, 31), date(2024, 4, 1)] {
            ledger
                .daily_entries
                .create(CreateDailyEntryInput {
                    order_booker_id: seed.booker.id.clone(),
                    date: day,
                    notes: None,
                    items: vec![entry_item(&seed.product.id, 1, 0)],
                })
                .await
                .unwrap();
        }

        let march = ledger.daily_entries.by_month(2024, 3).await.unwrap();
        let dates: Vec<_> = march.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![date(2024, 3, 31), date(2024, 3, 1)]);

        let february = ledger
            .daily_entries
            .list_with_items(&DailyEntryFilters {
                year: Some(2024),
                month: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(february.len(), 1);
        assert_eq!(february[0].items.len(), 1);
    }

    #[tokio::test]
    async fn returnable_items_skip_fully_returned_lines() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;
        ledger
            .daily_entries
            .create(CreateDailyEntryInput {
                order_booker_id: seed.booker.id.clone(),
                date: date(2024, 3, 5),
                notes: None,
                items: vec![
                    entry_item(&seed.product.id, 10, 2),
                    entry_item(&seed.product.id, 4, 4),
                ],
            })
            .await
            .unwrap();

        let items = ledger
            .daily_entries
            .returnable_items(&seed.booker.id, date(2024, 3, 1))
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item.net_quantity, 8);
        assert_eq!(items[0].product_name, "P1");

        let later = ledger
            .daily_entries
            .returnable_items(&seed.booker.id, date(2024, 3, 6))
            .await
            .unwrap();
        assert!(later.is_empty());
    }

    #[tokio::test]
    async fn monthly_analytics_on_empty_month_is_zero() {
        let ledger = ledger().await;

        let analytics = ledger.daily_entries.monthly_analytics(2024, 2).await.unwrap();
        assert_eq!(analytics.entries_count, 0);
        assert_eq!(analytics.total_amount, Decimal::ZERO);
        assert_eq!(analytics.net_amount, Decimal::ZERO);
        assert_eq!(analytics.average_daily_amount, Decimal::ZERO);
        assert_eq!(analytics.return_rate, Decimal::ZERO);
        assert_eq!(analytics.quantity_return_rate, Decimal::ZERO);
    }

    #[tokio::test]
    async fn monthly_analytics_sums_quantities() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;
        ledger
            .daily_entries
            .create(CreateDailyEntryInput {
                order_booker_id: seed.booker.id.clone(),
                date: date(2024, 3, 1),
                notes: None,
                items: vec![entry_item(&seed.product.id, 120, 20)],
            })
            .await
            .unwrap();

        let analytics = ledger.daily_entries.monthly_analytics(2024, 3).await.unwrap();
        assert_eq!(analytics.entries_count, 1);
        assert_eq!(analytics.items_count, 1);
        assert_eq!(analytics.quantity_sold, 120);
        assert_eq!(analytics.quantity_returned, 20);
        assert_eq!(analytics.net_quantity, 100);
        assert_eq!(analytics.net_amount, dec(15_000));
    }
}

// ============================================================================
// Orders
// ============================================================================

#[cfg(test)]
mod order_tests {
    use super::*;

    #[tokio::test]
    async fn create_converts_units_to_cartons() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;

        let created = ledger
            .orders
            .create(CreateOrderInput {
                order_booker_id: seed.booker.id.clone(),
                order_date: date(2024, 3, 1),
                supply_date: None,
                status: None,
                notes: None,
                items: vec![order_item(&seed.product.id, 240, 24)],
            })
            .await
            .unwrap();

        let item = &created.items[0];
        assert_eq!(item.cartons, dec(10));
        assert_eq!(item.total_cost, dec(24_000));
        assert_eq!(item.total_amount, dec(36_000));
        assert_eq!(item.profit, dec(12_000));
        assert_eq!(item.return_cartons, dec(1));
        assert_eq!(item.return_amount, dec(3_600));

        let order = &created.order;
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, item.total_amount);
        assert_eq!(order.total_cost, item.total_cost);
        assert_eq!(order.total_profit, item.profit);
        assert_eq!(order.total_cartons, item.cartons);
        assert_eq!(order.return_cartons, item.return_cartons);
        assert_eq!(order.return_amount, item.return_amount);
    }

    #[tokio::test]
    async fn oversized_quantities_and_prices_are_rejected() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;
        let huge = Decimal::from(1_000_000_000_000_000i64);

        let err = ledger
            .orders
            .create(CreateOrderInput {
                order_booker_id: seed.booker.id.clone(),
                order_date: date(2024, 3, 1),
                supply_date: None,
                status: None,
                notes: None,
                items: vec![OrderItemInput {
                    cost_price: Some(huge),
                    sell_price: Some(huge),
                    ..order_item(&seed.product.id, 1_000_000_000_000_000, 0)
                }],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = ledger
            .orders
            .create(CreateOrderInput {
                order_booker_id: seed.booker.id.clone(),
                order_date: date(2024, 3, 1),
                supply_date: None,
                status: None,
                notes: None,
                items: vec![OrderItemInput {
                    sell_price: Some(huge),
                    ..order_item(&seed.product.id, 10, 0)
                }],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = ledger
            .daily_entries
            .create(CreateDailyEntryInput {
                order_booker_id: seed.booker.id.clone(),
                date: date(2024, 3, 1),
                notes: None,
                items: vec![DailyEntryItemInput {
                    sell_price_override: Some(huge),
                    ..entry_item(&seed.product.id, 1_000_000_000_000_000, 0)
                }],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(count(&ledger, "orders").await, 0);
        assert_eq!(count(&ledger, "daily_entries").await, 0);
    }

    #[tokio::test]
    async fn failed_item_rolls_back_whole_order() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;

        let err = ledger
            .orders
            .create(CreateOrderInput {
                order_booker_id: seed.booker.id.clone(),
                order_date: date(2024, 3, 1),
                supply_date: None,
                status: None,
                notes: None,
                items: vec![
                    order_item(&seed.product.id, 10, 0),
                    order_item(&seed.product.id, 20, 0),
                    order_item("no-such-product", 30, 0),
                ],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ReferenceNotFound { entity: "product", .. }));
        assert_eq!(count(&ledger, "orders").await, 0);
        assert_eq!(count(&ledger, "order_items").await, 0);
    }

    #[tokio::test]
    async fn recording_a_return_moves_only_that_line() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;
        let single = common::product(&ledger, &seed.company_id, "Loose", 100, 150, 1).await;

        let created = ledger
            .orders
            .create(CreateOrderInput {
                order_booker_id: seed.booker.id.clone(),
                order_date: date(2024, 3, 1),
                supply_date: None,
                status: None,
                notes: None,
                items: vec![order_item(&single.id, 10, 0), order_item(&seed.product.id, 48, 0)],
            })
            .await
            .unwrap();
        let before = created.order.clone();
        let other = created.items[1].clone();

        let item = ledger.orders.record_return(&created.items[0].id, 5).await.unwrap();
        assert_eq!(item.return_amount, dec(750));
        assert_eq!(item.return_cartons, dec(5));

        let after = ledger.orders.get_with_items(&before.id).await.unwrap().unwrap();
        assert_eq!(after.order.return_amount - before.return_amount, dec(750));
        assert_eq!(after.order.return_cartons - before.return_cartons, dec(5));
        assert_eq!(after.order.total_amount, before.total_amount);
        assert_eq!(after.items[1].totals(), other.totals());

        let err = ledger.orders.record_return(&created.items[0].id, 11).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn item_mutations_keep_header_equal_to_items() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;
        let created = ledger
            .orders
            .create(CreateOrderInput {
                order_booker_id: seed.booker.id.clone(),
                order_date: date(2024, 3, 1),
                supply_date: None,
                status: None,
                notes: None,
                items: vec![order_item(&seed.product.id, 24, 0)],
            })
            .await
            .unwrap();
        let order_id = created.order.id.clone();

        let added = ledger
            .orders
            .add_item(&order_id, order_item(&seed.product.id, 12, 0))
            .await
            .unwrap();
        let order = ledger.orders.get_by_id(&order_id).await.unwrap().unwrap();
        assert_eq!(order.total_amount, dec(5_400));
        assert_eq!(order.total_cartons, Decimal::new(15, 1));

        let order = ledger.orders.remove_item(&added.id).await.unwrap();
        assert_eq!(order.total_amount, dec(3_600));
        assert_eq!(order.total_profit, order.total_amount - order.total_cost);
        assert_eq!(ledger.orders.items(&order_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_sets_status_and_clears_supply_date() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;
        let created = ledger
            .orders
            .create(CreateOrderInput {
                order_booker_id: seed.booker.id.clone(),
                order_date: date(2024, 3, 1),
                supply_date: Some(date(2024, 3, 3)),
                status: None,
                notes: Some("first".to_string()),
                items: vec![order_item(&seed.product.id, 24, 0)],
            })
            .await
            .unwrap();
        let id = created.order.id.clone();

        let supplied = ledger
            .orders
            .update(
                &id,
                UpdateOrderInput {
                    status: Some(OrderStatus::Supplied),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(supplied.order.status, OrderStatus::Supplied);
        assert_eq!(supplied.order.supply_date, Some(date(2024, 3, 3)));
        assert_eq!(supplied.order.notes.as_deref(), Some("first"));

        let cleared = ledger
            .orders
            .update(
                &id,
                UpdateOrderInput {
                    clear_supply_date: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.order.supply_date, None);

        let err = ledger
            .orders
            .update("missing", UpdateOrderInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_moves_order_to_another_booker() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;
        let other = booker(&ledger, "OB2").await;
        let created = ledger
            .orders
            .create(CreateOrderInput {
                order_booker_id: seed.booker.id.clone(),
                order_date: date(2024, 3, 1),
                supply_date: None,
                status: None,
                notes: None,
                items: vec![order_item(&seed.product.id, 24, 0)],
            })
            .await
            .unwrap();
        let id = created.order.id.clone();
        let mut changes = ledger.notifier.subscribe();

        let moved = ledger
            .orders
            .update(
                &id,
                UpdateOrderInput {
                    order_booker_id: Some(other.id.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.order.order_booker_id, other.id);
        assert_eq!(moved.order.total_amount, created.order.total_amount);

        let change = changes.recv().await.unwrap();
        assert!(change.has_key(&order_booker_key(&seed.booker.id)));
        assert!(change.has_key(&order_booker_key(&other.id)));

        let theirs = ledger
            .orders
            .list(&OrderFilters {
                order_booker_id: Some(other.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(theirs.len(), 1);

        let err = ledger
            .orders
            .update(
                &id,
                UpdateOrderInput {
                    order_booker_id: Some("nobody".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ReferenceNotFound { entity: "order booker", .. }));
        let unchanged = ledger.orders.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(unchanged.order_booker_id, other.id);
    }

    #[tokio::test]
    async fn summary_counts_by_status() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;
        for status in [OrderStatus::Pending, OrderStatus::Completed, OrderStatus::Completed] {
            ledger
                .orders
                .create(CreateOrderInput {
                    order_booker_id: seed.booker.id.clone(),
                    order_date: date(2024, 3, 1),
                    supply_date: None,
                    status: Some(status),
                    notes: None,
                    items: vec![order_item(&seed.product.id, 24, 0)],
                })
                .await
                .unwrap();
        }

        let summary = ledger.orders.summary(&OrderFilters::default()).await.unwrap();
        assert_eq!(summary.total_orders, 3);
        assert_eq!(summary.pending_orders, 1);
        assert_eq!(summary.completed_orders, 2);
        assert_eq!(summary.total_amount, dec(10_800));

        let completed = ledger
            .orders
            .list(&OrderFilters {
                status: Some(OrderStatus::Completed),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(completed.len(), 2);
    }

    #[tokio::test]
    async fn product_in_use_cannot_be_deleted() {
        let ledger = ledger().await;
        let seed = seed(&ledger).await;
        ledger
            .orders
            .create(CreateOrderInput {
                order_booker_id: seed.booker.id.clone(),
                order_date: date(2024, 3, 1),
                supply_date: None,
                status: None,
                notes: None,
                items: vec![order_item(&seed.product.id, 1, 0)],
            })
            .await
            .unwrap();

        let err = ledger.products.delete(&seed.product.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
        let err = ledger.companies.delete(&seed.company_id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }
}
