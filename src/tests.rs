//! Integration tests for the till
//! These tests drive the command layer against an in-memory SQLite database

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;

    use crate::cash_flow::DiscrepancyKind;
    use crate::clock::ManualClock;
    use crate::commands::{cash_flow, categories, orders, products, reports, settings};
    use crate::db::{Database, SnapshotStore, SqliteStore, StoreId};
    use crate::draft::{DraftState, OrderDetails};
    use crate::error::{Error, Result, ValidationError};
    use crate::models::{
        CloseCashFlow, CreateProduct, Currency, Order, OrderKind, OrderStatus, PaymentBucket,
        PaymentInput, PaymentMethodId, Product, RestaurantInfoPatch, Snapshot, UpdateProduct,
    };
    use crate::pos::Pos;
    use crate::settings::DEFAULT_PASSWORD;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).expect("Invalid decimal literal")
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    /// Open a till that is still locked
    fn open_pos(db: &Arc<Database>, clock: &Arc<ManualClock>) -> Pos {
        let store = SqliteStore::new(db.clone(), StoreId::for_restaurant("Test Bistro"));
        Pos::open_with_clock(Box::new(store), Box::new(clock.clone())).expect("Failed to open till")
    }

    fn sign_in(pos: &mut Pos) {
        settings::login(pos, "Test Bistro", DEFAULT_PASSWORD).expect("Failed to sign in");
    }

    /// Create a locked till over a fresh in-memory database
    fn setup_locked_pos() -> (Pos, Arc<ManualClock>, Arc<Database>) {
        let db = Arc::new(Database::open_in_memory().expect("Failed to create in-memory database"));
        db.initialize().expect("Failed to create schema");
        let clock = Arc::new(ManualClock::new(t0()));
        let pos = open_pos(&db, &clock);
        (pos, clock, db)
    }

    /// Create a signed-in till over a fresh in-memory database
    fn setup_test_pos() -> (Pos, Arc<ManualClock>, Arc<Database>) {
        let (mut pos, clock, db) = setup_locked_pos();
        sign_in(&mut pos);
        (pos, clock, db)
    }

    /// Seed test data: a burger at 12.50, fries at 5.00 and a soda at 3.25
    fn seed_test_data(pos: &mut Pos) -> Vec<Product> {
        [("Burger", "12.50", "food"), ("Fries", "5.00", "food"), ("Soda", "3.25", "drink")]
            .into_iter()
            .map(|(name, price, category)| {
                products::create_product(
                    pos,
                    CreateProduct {
                        name: name.to_string(),
                        price: dec(price),
                        category: category.to_string(),
                        image: None,
                    },
                )
                .expect("Failed to seed product")
            })
            .collect()
    }

    fn ring_up_dine_in(pos: &mut Pos, table: u32, items: &[&Product]) -> String {
        let id = orders::start_order(pos).unwrap();
        orders::select_order_type(pos, &id, OrderKind::DineIn).unwrap();
        orders::submit_order_details(
            pos,
            &id,
            OrderDetails {
                table_number: Some(table),
                customer_name: None,
            },
        )
        .unwrap();
        for product in items {
            orders::add_to_order(pos, &id, &product.id).unwrap();
        }
        id
    }

    fn pay(pos: &mut Pos, id: &str, method: PaymentMethodId, cash_received: Option<&str>) -> Result<Decimal> {
        orders::begin_payment(pos, id)?;
        let sale = orders::complete_order(
            pos,
            id,
            PaymentInput {
                method,
                cash_received: cash_received.map(dec),
            },
        )?;
        Ok(sale.change)
    }

    fn pending_order(id: &str, at: DateTime<Utc>, total: &str) -> Order {
        Order {
            id: id.to_string(),
            lines: Vec::new(),
            kind: OrderKind::DineIn,
            status: OrderStatus::Pending,
            total: dec(total),
            payment_method: Some(PaymentMethodId::Cash),
            created_at: at,
            table_number: Some(9),
            customer_name: None,
            order_code: None,
        }
    }

    /// Store that can be told to refuse writes
    struct FlakyStore {
        inner: SqliteStore,
        fail: Arc<AtomicBool>,
    }

    impl SnapshotStore for FlakyStore {
        fn load(&self) -> Result<Option<Snapshot>> {
            self.inner.load()
        }

        fn save(&self, snapshot: &Snapshot) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Database("disk full".to_string()));
            }
            self.inner.save(snapshot)
        }
    }

    // ===== CATALOG TESTS =====

    #[test]
    fn test_create_product() {
        let (mut pos, _, _) = setup_test_pos();
        let seeded = seed_test_data(&mut pos);

        let burger = products::get_product(&pos, &seeded[0].id).unwrap();
        assert_eq!(burger.name, "Burger");
        assert_eq!(burger.price, dec("12.50"));
        assert_eq!(burger.image, "");

        let names: Vec<String> = products::get_products(&pos).unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Burger", "Fries", "Soda"]);
        assert_eq!(products::get_products_by_category(&pos, "food").unwrap().len(), 2);
    }

    #[test]
    fn test_product_validation() {
        let (mut pos, _, _) = setup_test_pos();

        let unknown = products::create_product(
            &mut pos,
            CreateProduct {
                name: "Cake".to_string(),
                price: dec("4.00"),
                category: "dessert".to_string(),
                image: None,
            },
        );
        assert!(matches!(
            unknown,
            Err(Error::Validation(ValidationError::UnknownCategory(_)))
        ));

        let negative = products::create_product(
            &mut pos,
            CreateProduct {
                name: "Cake".to_string(),
                price: dec("-1"),
                category: "food".to_string(),
                image: None,
            },
        );
        assert!(negative.is_err());
        assert!(pos.state().products.is_empty());
    }

    #[test]
    fn test_price_change_keeps_rung_up_lines() {
        let (mut pos, _, _) = setup_test_pos();
        let seeded = seed_test_data(&mut pos);
        let id = ring_up_dine_in(&mut pos, 3, &[&seeded[0]]);

        let updated = products::update_product(
            &mut pos,
            UpdateProduct {
                id: seeded[0].id.clone(),
                name: "Double Burger".to_string(),
                price: dec("15.00"),
                category: "food".to_string(),
                image: String::new(),
            },
        )
        .unwrap();
        assert_eq!(updated.price, dec("15.00"));
        let stored = products::get_product(&pos, &seeded[0].id).unwrap();
        assert_eq!(stored.name, "Double Burger");
        assert_eq!(stored.price, dec("15.00"));

        let draft = orders::get_draft(&pos, &id).unwrap();
        assert_eq!(draft.lines()[0].unit_price, dec("12.50"));
        assert_eq!(draft.lines()[0].name, "Burger");
        assert_eq!(draft.total(), dec("12.50"));

        pay(&mut pos, &id, PaymentMethodId::Cash, None).unwrap();
        let order = orders::get_order(&pos, &id).unwrap();
        assert_eq!(order.total, dec("12.50"));
        assert_eq!(order.lines[0].unit_price, dec("12.50"));

        let receipt = reports::order_receipt(&pos, &id).unwrap();
        assert_eq!(receipt.total, dec("12.50"));
        assert_eq!(receipt.lines[0].name, "Burger");
        assert_eq!(receipt.lines[0].unit_price, dec("12.50"));

        // New lines pick up the new price
        let next = ring_up_dine_in(&mut pos, 4, &[&seeded[0]]);
        assert_eq!(orders::get_draft(&pos, &next).unwrap().total(), dec("15.00"));
    }

    #[test]
    fn test_delete_missing_product() {
        let (mut pos, _, _) = setup_test_pos();
        assert!(matches!(
            products::delete_product(&mut pos, "ghost"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_delete_category_keeps_products() {
        let (mut pos, _, _) = setup_test_pos();
        let seeded = seed_test_data(&mut pos);

        categories::delete_category(&mut pos, "drink").unwrap();

        assert_eq!(categories::get_categories(&pos).unwrap(), vec!["food".to_string()]);
        let soda = products::get_product(&pos, &seeded[2].id).unwrap();
        assert_eq!(soda.category, "drink");
    }

    #[test]
    fn test_category_unique() {
        let (mut pos, _, _) = setup_test_pos();
        assert_eq!(categories::create_category(&mut pos, " dessert ").unwrap(), "dessert");
        assert!(matches!(
            categories::create_category(&mut pos, "dessert"),
            Err(Error::Validation(ValidationError::DuplicateCategory(_)))
        ));
    }

    // ===== ORDER TESTS =====

    #[test]
    fn test_dine_in_cash_sale() {
        let (mut pos, _, _) = setup_test_pos();
        let seeded = seed_test_data(&mut pos);

        let id = ring_up_dine_in(&mut pos, 4, &[&seeded[0], &seeded[0]]);
        let draft = orders::get_draft(&pos, &id).unwrap();
        assert_eq!(draft.lines().len(), 1);
        assert_eq!(draft.lines()[0].quantity, 2);
        assert_eq!(draft.total(), dec("25.00"));

        let change = pay(&mut pos, &id, PaymentMethodId::Cash, Some("30")).unwrap();
        assert_eq!(change, dec("5.00"));

        let order = orders::get_order(&pos, &id).unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.total, dec("25.00"));
        assert_eq!(order.table_number, Some(4));
        assert_eq!(order.created_at, t0());
        assert!(order.order_code.is_none());
        assert!(orders::get_drafts(&pos).unwrap().is_empty());
    }

    #[test]
    fn test_order_total_matches_lines() {
        let (mut pos, _, _) = setup_test_pos();
        let seeded = seed_test_data(&mut pos);

        let id = ring_up_dine_in(&mut pos, 1, &[&seeded[0], &seeded[1], &seeded[2], &seeded[1]]);
        let draft = orders::remove_from_order(&mut pos, &id, &seeded[0].id).unwrap();

        let expected: Decimal = draft
            .lines()
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.quantity))
            .sum();
        assert_eq!(draft.total(), expected);
        assert_eq!(draft.total(), dec("13.25"));
    }

    #[test]
    fn test_takeaway_gets_order_code() {
        let (mut pos, _, _) = setup_test_pos();
        let seeded = seed_test_data(&mut pos);

        let id = orders::start_order(&mut pos).unwrap();
        orders::select_order_type(&mut pos, &id, OrderKind::Takeaway).unwrap();
        let missing = orders::submit_order_details(&mut pos, &id, OrderDetails::default());
        assert!(matches!(
            missing,
            Err(Error::Validation(ValidationError::MissingCustomerName))
        ));

        orders::submit_order_details(
            &mut pos,
            &id,
            OrderDetails {
                table_number: None,
                customer_name: Some("Ana".to_string()),
            },
        )
        .unwrap();
        orders::add_to_order(&mut pos, &id, &seeded[2].id).unwrap();
        let change = pay(&mut pos, &id, PaymentMethodId::Pix, None).unwrap();
        assert_eq!(change, Decimal::ZERO);

        let order = orders::get_order(&pos, &id).unwrap();
        let code = order.order_code.unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert_eq!(order.customer_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn test_insufficient_cash_keeps_draft() {
        let (mut pos, _, _) = setup_test_pos();
        let seeded = seed_test_data(&mut pos);
        let id = ring_up_dine_in(&mut pos, 2, &[&seeded[0]]);

        let result = pay(&mut pos, &id, PaymentMethodId::Cash, Some("10"));
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::InsufficientCash { .. }))
        ));

        let draft = orders::get_draft(&pos, &id).unwrap();
        assert!(matches!(draft.state(), DraftState::Paying(_)));
        assert!(pos.state().orders.is_empty());

        let change = orders::complete_order(
            &mut pos,
            &id,
            PaymentInput {
                method: PaymentMethodId::Cash,
                cash_received: None,
            },
        )
        .unwrap()
        .change;
        assert_eq!(change, Decimal::ZERO);
        assert_eq!(pos.state().orders.len(), 1);
    }

    #[test]
    fn test_disabled_method_rejected() {
        let (mut pos, _, _) = setup_test_pos();
        let seeded = seed_test_data(&mut pos);
        settings::toggle_payment_method(&mut pos, PaymentMethodId::Vr).unwrap();

        let id = ring_up_dine_in(&mut pos, 3, &[&seeded[1]]);
        let prompt = orders::begin_payment(&mut pos, &id).unwrap();
        assert_eq!(prompt.total, dec("5.00"));
        assert!(prompt.methods.iter().all(|m| m.id != PaymentMethodId::Vr));

        let result = orders::complete_order(
            &mut pos,
            &id,
            PaymentInput {
                method: PaymentMethodId::Vr,
                cash_received: None,
            },
        );
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::PaymentMethodUnavailable(_)))
        ));
        assert!(pos.state().orders.is_empty());
    }

    #[test]
    fn test_empty_order_cannot_pay() {
        let (mut pos, _, _) = setup_test_pos();
        let id = ring_up_dine_in(&mut pos, 5, &[]);
        assert!(matches!(
            orders::begin_payment(&mut pos, &id),
            Err(Error::Validation(ValidationError::EmptyOrder))
        ));
    }

    #[test]
    fn test_wrong_state_action_rejected() {
        let (mut pos, _, _) = setup_test_pos();
        let seeded = seed_test_data(&mut pos);

        let id = orders::start_order(&mut pos).unwrap();
        let result = orders::add_to_order(&mut pos, &id, &seeded[0].id);
        assert!(matches!(result, Err(Error::InvalidTransition { .. })));
        assert!(orders::get_draft(&pos, &id).unwrap().lines().is_empty());
    }

    #[test]
    fn test_leave_payment_returns_to_building() {
        let (mut pos, _, _) = setup_test_pos();
        let seeded = seed_test_data(&mut pos);
        let id = ring_up_dine_in(&mut pos, 6, &[&seeded[0]]);

        orders::begin_payment(&mut pos, &id).unwrap();
        assert!(orders::add_to_order(&mut pos, &id, &seeded[1].id).is_err());

        orders::leave_payment(&mut pos, &id).unwrap();
        let draft = orders::add_to_order(&mut pos, &id, &seeded[1].id).unwrap();
        assert_eq!(draft.total(), dec("17.50"));
    }

    #[test]
    fn test_cancel_never_touches_ledger() {
        let (mut pos, _, _) = setup_test_pos();
        let seeded = seed_test_data(&mut pos);
        let id = ring_up_dine_in(&mut pos, 7, &[&seeded[0]]);
        orders::begin_payment(&mut pos, &id).unwrap();

        orders::cancel_order(&mut pos, &id).unwrap();
        assert!(pos.state().orders.is_empty());
        assert!(matches!(orders::get_draft(&pos, &id), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_multiple_tables_same_time() {
        let (mut pos, _, _) = setup_test_pos();
        let seeded = seed_test_data(&mut pos);

        let table_one = ring_up_dine_in(&mut pos, 1, &[&seeded[0]]);
        let table_two = ring_up_dine_in(&mut pos, 2, &[&seeded[2], &seeded[2]]);
        assert_eq!(orders::get_drafts(&pos).unwrap().len(), 2);

        pay(&mut pos, &table_two, PaymentMethodId::Debit, None).unwrap();
        let remaining = orders::get_drafts(&pos).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id(), table_one);
        assert_eq!(orders::get_order(&pos, &table_two).unwrap().total, dec("6.50"));
    }

    #[test]
    fn test_update_order() {
        let (mut pos, _, _) = setup_test_pos();
        pos.commit(|state, now| {
            state.orders.append(pending_order("p1", now, "8.00"));
            Ok(())
        })
        .unwrap();
        assert_eq!(orders::get_active_orders(&pos).unwrap().len(), 1);

        let mut order = orders::get_order(&pos, "p1").unwrap();
        order.status = OrderStatus::Completed;
        orders::update_order(&mut pos, order.clone()).unwrap();
        assert!(orders::get_active_orders(&pos).unwrap().is_empty());

        order.total = dec("9.00");
        assert!(matches!(
            orders::update_order(&mut pos, order),
            Err(Error::Validation(ValidationError::CompletedTotalChanged(_)))
        ));
        assert!(matches!(
            orders::update_order(&mut pos, pending_order("ghost", t0(), "1")),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_completed_sale_stays_completed() {
        let (mut pos, clock, _) = setup_test_pos();
        let seeded = seed_test_data(&mut pos);
        let session = cash_flow::open_cash_flow(&mut pos, Decimal::ZERO).unwrap();

        clock.advance(Duration::minutes(1));
        let id = ring_up_dine_in(&mut pos, 1, &[&seeded[0], &seeded[0]]);
        pay(&mut pos, &id, PaymentMethodId::Cash, None).unwrap();
        let sale = orders::get_order(&pos, &id).unwrap();

        let mut reopened = sale.clone();
        reopened.status = OrderStatus::Pending;
        assert!(matches!(
            orders::update_order(&mut pos, reopened),
            Err(Error::Validation(ValidationError::CompletedOrderReopened(_)))
        ));

        let mut repriced = sale.clone();
        repriced.total = dec("999");
        assert!(orders::update_order(&mut pos, repriced).is_err());

        let stored = orders::get_order(&pos, &id).unwrap();
        assert_eq!(stored, sale);
        let totals = cash_flow::get_cash_flow_totals(&pos, &session.id).unwrap();
        assert_eq!(totals.total_sales(), dec("25.00"));
    }

    // ===== CASH FLOW TESTS =====

    #[test]
    fn test_only_one_open_session() {
        let (mut pos, clock, _) = setup_test_pos();
        let first = cash_flow::open_cash_flow(&mut pos, dec("100")).unwrap();

        clock.advance(Duration::hours(1));
        let second = cash_flow::open_cash_flow(&mut pos, dec("50"));
        assert!(matches!(second, Err(Error::SessionAlreadyOpen { ref id }) if *id == first.id));

        let active = cash_flow::get_active_cash_flow(&pos).unwrap().unwrap();
        assert_eq!(active, first);
        assert_eq!(active.final_amount, dec("100"));
        assert_eq!(pos.state().cash_flows.len(), 1);
    }

    #[test]
    fn test_totals_exclude_pending_orders() {
        let (mut pos, clock, _) = setup_test_pos();
        let seeded = seed_test_data(&mut pos);
        let session = cash_flow::open_cash_flow(&mut pos, dec("50")).unwrap();

        clock.advance(Duration::minutes(5));
        let a = ring_up_dine_in(&mut pos, 1, &[&seeded[0], &seeded[0]]);
        pay(&mut pos, &a, PaymentMethodId::Cash, Some("30")).unwrap();
        let b = ring_up_dine_in(&mut pos, 2, &[&seeded[1]]);
        pay(&mut pos, &b, PaymentMethodId::Credit, None).unwrap();
        let at = pos.now();
        pos.commit(|state, _| {
            state.orders.append(pending_order("p1", at, "40.00"));
            Ok(())
        })
        .unwrap();

        let totals = cash_flow::get_cash_flow_totals(&pos, &session.id).unwrap();
        assert_eq!(totals.amount_for(PaymentMethodId::Cash), dec("25.00"));
        assert_eq!(totals.amount_for(PaymentMethodId::Credit), dec("5.00"));
        assert_eq!(totals.total_sales(), dec("30.00"));
        assert_eq!(totals.order_count(), 2);
    }

    #[test]
    fn test_orders_before_session_ignored() {
        let (mut pos, clock, _) = setup_test_pos();
        let seeded = seed_test_data(&mut pos);

        let early = ring_up_dine_in(&mut pos, 1, &[&seeded[1]]);
        pay(&mut pos, &early, PaymentMethodId::Cash, None).unwrap();

        clock.advance(Duration::minutes(1));
        let session = cash_flow::open_cash_flow(&mut pos, Decimal::ZERO).unwrap();
        let totals = cash_flow::get_cash_flow_totals(&pos, &session.id).unwrap();
        assert!(totals.buckets.is_empty());
    }

    #[test]
    fn test_close_freezes_totals() {
        let (mut pos, clock, _) = setup_test_pos();
        let seeded = seed_test_data(&mut pos);
        let session = cash_flow::open_cash_flow(&mut pos, dec("50")).unwrap();

        clock.advance(Duration::minutes(10));
        let id = ring_up_dine_in(&mut pos, 1, &[&seeded[0], &seeded[0]]);
        pay(&mut pos, &id, PaymentMethodId::Cash, Some("25")).unwrap();

        clock.advance(Duration::hours(4));
        let closed = cash_flow::close_cash_flow(
            &mut pos,
            CloseCashFlow {
                session_id: session.id.clone(),
                cashier_name: "Rui".to_string(),
                reported_amounts: BTreeMap::from([(PaymentMethodId::Cash, dec("30"))]),
            },
        )
        .unwrap();
        assert_eq!(closed.total_sales, Some(dec("25.00")));
        assert_eq!(closed.closed_at, Some(pos.now()));
        assert_eq!(closed.final_amount, closed.initial_amount);
        assert!(cash_flow::get_active_cash_flow(&pos).unwrap().is_none());

        // A late sale and a backdated one must not move the frozen figures
        clock.advance(Duration::minutes(1));
        let late = ring_up_dine_in(&mut pos, 2, &[&seeded[2]]);
        pay(&mut pos, &late, PaymentMethodId::Cash, None).unwrap();
        let mut backdated = pending_order("old", t0() + Duration::minutes(20), "7.00");
        backdated.status = OrderStatus::Completed;
        pos.commit(|state, _| {
            state.orders.append(backdated.clone());
            Ok(())
        })
        .unwrap();

        let totals = cash_flow::get_cash_flow_totals(&pos, &session.id).unwrap();
        assert_eq!(totals.total_sales(), dec("25.00"));

        let receipt = reports::closing_receipt(&pos, &session.id).unwrap();
        assert_eq!(receipt.total_sales, dec("25.00"));
        assert_eq!(receipt.cashier_name.as_deref(), Some("Rui"));
        let cash = receipt
            .reconciliation
            .iter()
            .find(|d| d.method == PaymentMethodId::Cash)
            .unwrap();
        assert_eq!(cash.difference, dec("5.00"));
        assert_eq!(cash.kind(), DiscrepancyKind::Overage);
        assert_eq!(receipt.reconciliation.len(), 5);
    }

    #[test]
    fn test_close_rejects_closed_session() {
        let (mut pos, _, _) = setup_test_pos();
        let session = cash_flow::open_cash_flow(&mut pos, Decimal::ZERO).unwrap();
        let close = CloseCashFlow {
            session_id: session.id.clone(),
            cashier_name: "Rui".to_string(),
            reported_amounts: BTreeMap::new(),
        };

        cash_flow::close_cash_flow(&mut pos, close.clone()).unwrap();
        assert!(matches!(
            cash_flow::close_cash_flow(&mut pos, close),
            Err(Error::SessionNotOpen { .. })
        ));
    }

    #[test]
    fn test_close_rejects_disabled_method_amount() {
        let (mut pos, _, _) = setup_test_pos();
        settings::toggle_payment_method(&mut pos, PaymentMethodId::Pix).unwrap();
        let session = cash_flow::open_cash_flow(&mut pos, Decimal::ZERO).unwrap();

        let result = cash_flow::close_cash_flow(
            &mut pos,
            CloseCashFlow {
                session_id: session.id.clone(),
                cashier_name: "Rui".to_string(),
                reported_amounts: BTreeMap::from([(PaymentMethodId::Pix, dec("3"))]),
            },
        );
        assert!(result.is_err());
        assert!(cash_flow::get_active_cash_flow(&pos).unwrap().is_some());
    }

    #[test]
    fn test_closing_receipt_requires_closed_session() {
        let (mut pos, _, _) = setup_test_pos();
        let session = cash_flow::open_cash_flow(&mut pos, Decimal::ZERO).unwrap();
        assert!(matches!(
            reports::closing_receipt(&pos, &session.id),
            Err(Error::SessionStillOpen { .. })
        ));
    }

    #[test]
    fn test_preview_closing_shortage() {
        let (mut pos, clock, _) = setup_test_pos();
        let seeded = seed_test_data(&mut pos);
        cash_flow::open_cash_flow(&mut pos, dec("20")).unwrap();

        clock.advance(Duration::minutes(3));
        let id = ring_up_dine_in(&mut pos, 1, &[&seeded[1]]);
        pay(&mut pos, &id, PaymentMethodId::Cash, None).unwrap();

        let reported = BTreeMap::from([(PaymentMethodId::Cash, dec("4.50"))]);
        let preview = cash_flow::preview_closing(&pos, &reported).unwrap();
        assert_eq!(preview.total_sales, dec("5.00"));
        let cash = &preview.reconciliation[0];
        assert_eq!(cash.method, PaymentMethodId::Cash);
        assert_eq!(cash.difference, dec("-0.50"));
        assert_eq!(cash.kind(), DiscrepancyKind::Shortage);
    }

    #[test]
    fn test_recent_cash_flows() {
        let (mut pos, clock, _) = setup_test_pos();
        let mut ids = Vec::new();
        for day in 0..3 {
            clock.set(t0() + Duration::days(day * 4));
            let session = cash_flow::open_cash_flow(&mut pos, Decimal::ZERO).unwrap();
            clock.advance(Duration::hours(8));
            cash_flow::close_cash_flow(
                &mut pos,
                CloseCashFlow {
                    session_id: session.id.clone(),
                    cashier_name: "Rui".to_string(),
                    reported_amounts: BTreeMap::new(),
                },
            )
            .unwrap();
            ids.push(session.id);
        }

        let recent: Vec<String> = cash_flow::get_recent_cash_flows(&pos, None)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(recent, vec![ids[2].clone(), ids[1].clone()]);
        assert_eq!(cash_flow::get_recent_cash_flows(&pos, Some(30)).unwrap().len(), 3);
    }

    // ===== SETTINGS TESTS =====

    #[test]
    fn test_login_and_logout() {
        let (mut pos, _, _) = setup_locked_pos();
        assert!(!settings::is_signed_in(&pos));

        assert!(matches!(
            settings::login(&mut pos, "Spice Paradise", "nope"),
            Err(Error::InvalidPassword)
        ));
        assert!(!settings::is_signed_in(&pos));

        settings::login(&mut pos, " Spice Paradise ", "demo123").unwrap();
        assert!(settings::is_signed_in(&pos));
        let info = settings::get_settings(&pos).unwrap().restaurant;
        assert_eq!(info.name, "Spice Paradise");
        assert_eq!(info.password, "demo123");

        settings::logout(&mut pos);
        assert!(!settings::is_signed_in(&pos));
        assert_eq!(pos.settings().restaurant.name, "Spice Paradise");
    }

    #[test]
    fn test_commands_refused_while_locked() {
        let (mut pos, _, _) = setup_locked_pos();

        let product = CreateProduct {
            name: "Burger".to_string(),
            price: dec("12.50"),
            category: "food".to_string(),
            image: None,
        };
        assert!(matches!(
            products::create_product(&mut pos, product),
            Err(Error::NotSignedIn)
        ));
        assert!(matches!(products::get_products(&pos), Err(Error::NotSignedIn)));
        assert!(matches!(orders::start_order(&mut pos), Err(Error::NotSignedIn)));
        assert!(matches!(
            cash_flow::open_cash_flow(&mut pos, dec("50")),
            Err(Error::NotSignedIn)
        ));
        assert!(matches!(settings::get_settings(&pos), Err(Error::NotSignedIn)));
        assert!(matches!(
            reports::get_day_summary(&pos, None),
            Err(Error::NotSignedIn)
        ));
        assert!(pos.state().products.is_empty());
        assert!(pos.state().cash_flows.is_empty());
        assert!(pos.drafts().is_empty());

        sign_in(&mut pos);
        let seeded = seed_test_data(&mut pos);
        let id = ring_up_dine_in(&mut pos, 1, &[&seeded[0]]);
        let session = cash_flow::open_cash_flow(&mut pos, dec("50")).unwrap();

        settings::logout(&mut pos);
        assert!(matches!(
            orders::add_to_order(&mut pos, &id, &seeded[1].id),
            Err(Error::NotSignedIn)
        ));
        assert!(matches!(
            cash_flow::close_cash_flow(
                &mut pos,
                CloseCashFlow {
                    session_id: session.id.clone(),
                    cashier_name: "Rui".to_string(),
                    reported_amounts: BTreeMap::new(),
                },
            ),
            Err(Error::NotSignedIn)
        ));
        assert!(matches!(
            products::delete_product(&mut pos, &seeded[0].id),
            Err(Error::NotSignedIn)
        ));

        // Data is kept across the lock
        sign_in(&mut pos);
        assert_eq!(orders::get_draft(&pos, &id).unwrap().lines().len(), 1);
        assert!(cash_flow::get_active_cash_flow(&pos).unwrap().is_some());
        assert_eq!(products::get_products(&pos).unwrap().len(), 3);
    }

    #[test]
    fn test_settings_updates() {
        let (mut pos, _, _) = setup_test_pos();

        settings::update_currency(&mut pos, Currency::Brl).unwrap();
        assert_eq!(pos.settings().currency_symbol(), "R$");

        assert!(!settings::toggle_payment_method(&mut pos, PaymentMethodId::Debit).unwrap());
        assert_eq!(settings::get_enabled_payment_methods(&pos).unwrap().len(), 4);

        settings::update_restaurant_info(
            &mut pos,
            RestaurantInfoPatch {
                phone: Some("555-0199".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(pos.settings().restaurant.phone, "555-0199");

        assert!(settings::update_password(&mut pos, "   ").is_err());
        settings::update_password(&mut pos, "hunter2").unwrap();
        assert_eq!(pos.settings().restaurant.password, "hunter2");
    }

    // ===== REPORT TESTS =====

    #[test]
    fn test_day_summary_uses_local_day() {
        let (mut pos, clock, _) = setup_test_pos();
        let seeded = seed_test_data(&mut pos);
        let tz = FixedOffset::west_opt(3 * 3600).unwrap();

        // 23:59 and 00:01 local fall on different days
        clock.set(tz.with_ymd_and_hms(2024, 5, 10, 23, 59, 0).unwrap().with_timezone(&Utc));
        let late = ring_up_dine_in(&mut pos, 1, &[&seeded[0]]);
        pay(&mut pos, &late, PaymentMethodId::Cash, None).unwrap();

        clock.advance(Duration::minutes(2));
        let early = ring_up_dine_in(&mut pos, 2, &[&seeded[1]]);
        pay(&mut pos, &early, PaymentMethodId::Cash, None).unwrap();
        clock.advance(Duration::minutes(1));
        pos.commit(|state, now| {
            state.orders.append(pending_order("p1", now, "2.00"));
            Ok(())
        })
        .unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let first = reports::get_day_summary_in(&pos, Some(day), &tz).unwrap();
        assert_eq!(first.date, "2024-05-10");
        assert_eq!(first.total_orders, 1);
        assert_eq!(first.total_revenue, dec("12.50"));

        let second = reports::get_day_summary_in(&pos, None, &tz).unwrap();
        assert_eq!(second.date, "2024-05-11");
        assert_eq!(second.total_orders, 2);
        assert_eq!(second.total_revenue, dec("7.00"));
        assert_eq!(second.orders[0].id, "p1");
    }

    #[test]
    fn test_order_receipt() {
        let (mut pos, _, _) = setup_test_pos();
        let seeded = seed_test_data(&mut pos);
        settings::update_currency(&mut pos, Currency::Eur).unwrap();
        settings::update_password(&mut pos, "secret").unwrap();

        let id = ring_up_dine_in(&mut pos, 8, &[&seeded[0], &seeded[2]]);
        let preview = reports::draft_receipt(&pos, &id).unwrap();
        assert!(preview.created_at.is_none());
        assert_eq!(preview.total, dec("15.75"));

        pay(&mut pos, &id, PaymentMethodId::Credit, None).unwrap();
        let receipt = reports::order_receipt(&pos, &id).unwrap();
        assert_eq!(receipt.currency_symbol, "€");
        assert_eq!(receipt.payment_method.as_deref(), Some("Credit Card"));
        assert_eq!(receipt.lines.len(), 2);
        assert_eq!(receipt.table_number, Some(8));

        let json = serde_json::to_string(&receipt).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_draft_receipt_needs_details() {
        let (mut pos, _, _) = setup_test_pos();
        let id = orders::start_order(&mut pos).unwrap();
        assert!(matches!(
            reports::draft_receipt(&pos, &id),
            Err(Error::InvalidTransition { .. })
        ));
    }

    // ===== PERSISTENCE TESTS =====

    #[test]
    fn test_snapshot_survives_reopen() {
        let (mut pos, clock, db) = setup_test_pos();
        let seeded = seed_test_data(&mut pos);
        cash_flow::open_cash_flow(&mut pos, dec("75.10")).unwrap();
        let id = ring_up_dine_in(&mut pos, 3, &[&seeded[2]]);
        pay(&mut pos, &id, PaymentMethodId::Cash, Some("10")).unwrap();
        settings::update_currency(&mut pos, Currency::Rub).unwrap();
        let open_draft = ring_up_dine_in(&mut pos, 4, &[&seeded[0]]);

        let before = pos.state().clone();
        drop(pos);

        let mut reopened = open_pos(&db, &clock);
        sign_in(&mut reopened);
        assert_eq!(reopened.state(), &before);
        assert_eq!(reopened.state().orders.get(&id).unwrap().total, dec("3.25"));
        assert!(matches!(orders::get_draft(&reopened, &open_draft), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_snapshot_on_disk() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("data").join("till.db");
        let clock = Arc::new(ManualClock::new(t0()));

        let open = || {
            let db = Arc::new(Database::open(&path).expect("Failed to open database"));
            db.initialize().expect("Failed to create schema");
            let mut pos = open_pos(&db, &clock);
            sign_in(&mut pos);
            pos
        };

        let mut pos = open();
        seed_test_data(&mut pos);
        categories::create_category(&mut pos, "dessert").unwrap();
        drop(pos);

        let pos = open();
        assert_eq!(pos.state().products.len(), 3);
        assert!(pos.settings().has_category("dessert"));
    }

    #[test]
    fn test_failed_save_leaves_state_unchanged() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.initialize().unwrap();
        let fail = Arc::new(AtomicBool::new(false));
        let store = FlakyStore {
            inner: SqliteStore::new(db.clone(), StoreId::new("flaky")),
            fail: fail.clone(),
        };
        let mut pos = Pos::open_with_clock(Box::new(store), Box::new(ManualClock::new(t0()))).unwrap();
        sign_in(&mut pos);
        let seeded = seed_test_data(&mut pos);
        let before = pos.state().clone();

        fail.store(true, Ordering::SeqCst);
        assert!(cash_flow::open_cash_flow(&mut pos, dec("10")).is_err());
        assert!(products::delete_product(&mut pos, &seeded[0].id).is_err());

        let id = ring_up_dine_in(&mut pos, 1, &[&seeded[0]]);
        assert!(pay(&mut pos, &id, PaymentMethodId::Cash, None).is_err());
        assert_eq!(pos.state(), &before);
        assert!(matches!(
            orders::get_draft(&pos, &id).unwrap().state(),
            DraftState::Paying(_)
        ));

        fail.store(false, Ordering::SeqCst);
        orders::complete_order(
            &mut pos,
            &id,
            PaymentInput {
                method: PaymentMethodId::Cash,
                cash_received: None,
            },
        )
        .unwrap();
        let stored = SqliteStore::new(db, StoreId::new("flaky")).load().unwrap().unwrap();
        assert_eq!(&stored, pos.state());
        assert_eq!(stored.orders.iter().filter(|o| o.id == id).count(), 1);
        let order = stored.orders.get(&id).unwrap();
        assert_eq!(
            PaymentBucket::for_order(order),
            PaymentBucket::Method(PaymentMethodId::Cash)
        );
    }
}
