//! Read model for order listings.
//!
//! Filtering, sorting and paging run over a snapshot of orders so the same
//! logic is exercised with or without storage.

use crate::error::DepotError;
use crate::state::Records;
use depot_config::QueryConfig;
use depot_types::{
	Order, OrderQuery, OrderSortField, OrderSummary, Page, SortDirection, StorageKey, Store,
};
use std::cmp::Ordering;
use std::collections::HashMap;

pub struct OrderQueryService {
	records: Records,
	config: QueryConfig,
}

impl OrderQueryService {
	pub fn new(records: Records, config: QueryConfig) -> Self {
		Self { records, config }
	}

	pub async fn list_orders(&self, query: &OrderQuery) -> Result<Page<OrderSummary>, DepotError> {
		let orders: Vec<Order> = self.records.all(StorageKey::Orders).await?;
		let stores: Vec<Store> = self.records.all(StorageKey::Stores).await?;
		let names: HashMap<String, String> =
			stores.into_iter().map(|s| (s.id, s.name)).collect();
		select(&orders, &names, query, &self.config)
	}
}

/// Filters, sorts and pages `orders`.
///
/// `store_names` maps store id to display name; orders whose store is
/// missing list an empty name.
pub fn select(
	orders: &[Order],
	store_names: &HashMap<String, String>,
	query: &OrderQuery,
	config: &QueryConfig,
) -> Result<Page<OrderSummary>, DepotError> {
	let page = query.page.unwrap_or(1);
	if page == 0 {
		return Err(DepotError::validation("Page numbers start at 1"));
	}
	let size = query
		.size
		.unwrap_or(config.default_page_size)
		.clamp(1, config.max_page_size.max(1));
	let needle = query
		.search
		.as_deref()
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(str::to_lowercase);

	let mut matches: Vec<(&Order, &str)> = orders
		.iter()
		.map(|o| {
			let name = store_names.get(&o.store_id).map(String::as_str).unwrap_or("");
			(o, name)
		})
		.filter(|(o, name)| matches_filters(o, query) && matches_search(o, name, needle.as_deref()))
		.collect();

	let field = query.sort_by.unwrap_or_default();
	let direction = query.direction.unwrap_or_default();
	matches.sort_by(|(a, _), (b, _)| {
		let ordering = compare(a, b, field);
		let ordering = match direction {
			SortDirection::Asc => ordering,
			SortDirection::Desc => ordering.reverse(),
		};
		ordering.then_with(|| a.id.cmp(&b.id))
	});

	let total = matches.len();
	let start = (page as usize - 1).saturating_mul(size as usize);
	let items = matches
		.into_iter()
		.skip(start)
		.take(size as usize)
		.map(|(o, name)| OrderSummary::from_order(o, name))
		.collect();

	Ok(Page {
		items,
		total,
		page,
		size,
	})
}

fn matches_filters(order: &Order, q: &OrderQuery) -> bool {
	q.status.is_none_or(|s| order.status == s)
		&& q.store_id.as_ref().is_none_or(|id| &order.store_id == id)
		&& q.agent_id.as_ref().is_none_or(|id| &order.agent_id == id)
		&& q
			.distributor_id
			.as_ref()
			.is_none_or(|id| order.distributor_id.as_ref() == Some(id))
		&& q
			.warehouse_id
			.as_ref()
			.is_none_or(|id| order.warehouse_id.as_ref() == Some(id))
		&& q.priority.is_none_or(|p| order.priority == p)
		&& q.created_from.is_none_or(|from| order.created_at >= from)
		&& q.created_to.is_none_or(|to| order.created_at <= to)
		&& q
			.scheduled_from
			.is_none_or(|from| order.scheduled_for.is_some_and(|at| at >= from))
		&& q
			.scheduled_to
			.is_none_or(|to| order.scheduled_for.is_some_and(|at| at <= to))
}

fn matches_search(order: &Order, store_name: &str, needle: Option<&str>) -> bool {
	let Some(needle) = needle else {
		return true;
	};
	order.id.to_lowercase().contains(needle)
		|| store_name.to_lowercase().contains(needle)
		|| order
			.notes
			.as_deref()
			.is_some_and(|n| n.to_lowercase().contains(needle))
}

fn compare(a: &Order, b: &Order, field: OrderSortField) -> Ordering {
	match field {
		OrderSortField::CreatedAt => a.created_at.cmp(&b.created_at),
		// Unscheduled orders sort before scheduled ones.
		OrderSortField::ScheduledFor => a.scheduled_for.cmp(&b.scheduled_for),
		OrderSortField::Total => a.total.cmp(&b.total),
		OrderSortField::Status => a.status.cmp(&b.status),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{DateTime, Duration, TimeZone, Utc};
	use depot_types::OrderStatus;
	use rust_decimal::Decimal;

	fn at(day: u32) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap()
	}

	fn order(id: &str, store: &str, day: u32, total: i64, status: OrderStatus) -> Order {
		Order {
			id: id.into(),
			store_id: store.into(),
			distributor_id: None,
			warehouse_id: Some("w1".into()),
			agent_id: "agent".into(),
			trip_id: None,
			status,
			priority: false,
			scheduled_for: None,
			notes: None,
			sub_total: Decimal::new(total, 0),
			tax: Decimal::ZERO,
			total: Decimal::new(total, 0),
			items: vec![],
			payments: vec![],
			created_at: at(day),
			updated_at: at(day),
			created_by: "agent".into(),
			updated_by: "agent".into(),
		}
	}

	fn fixture() -> (Vec<Order>, HashMap<String, String>) {
		let mut orders = vec![
			order("o1", "s1", 1, 100, OrderStatus::Pending),
			order("o2", "s2", 2, 50, OrderStatus::Confirmed),
			order("o3", "s1", 3, 75, OrderStatus::Pending),
			order("o4", "s2", 3, 75, OrderStatus::Delivered),
		];
		orders[1].notes = Some("Leave at the BACK door".into());
		orders[2].scheduled_for = Some(at(10));
		let names = HashMap::from([
			("s1".to_string(), "Aling Nena Store".to_string()),
			("s2".to_string(), "Mang Tomas Mart".to_string()),
		]);
		(orders, names)
	}

	fn ids(page: &Page<OrderSummary>) -> Vec<&str> {
		page.items.iter().map(|s| s.id.as_str()).collect()
	}

	#[test]
	fn test_default_sort_is_newest_first_with_id_tiebreak() {
		let (orders, names) = fixture();
		let page = select(&orders, &names, &OrderQuery::default(), &QueryConfig::default()).unwrap();
		assert_eq!(ids(&page), vec!["o3", "o4", "o2", "o1"]);
		assert_eq!(page.total, 4);
		assert_eq!(page.items[1].store_name, "Mang Tomas Mart");
	}

	#[test]
	fn test_filters_combine() {
		let (orders, names) = fixture();
		let query = OrderQuery {
			status: Some(OrderStatus::Pending),
			store_id: Some("s1".into()),
			created_from: Some(at(2)),
			..Default::default()
		};
		let page = select(&orders, &names, &query, &QueryConfig::default()).unwrap();
		assert_eq!(ids(&page), vec!["o3"]);
	}

	#[test]
	fn test_date_bounds_are_inclusive() {
		let (orders, names) = fixture();
		let query = OrderQuery {
			created_from: Some(at(2)),
			created_to: Some(at(2)),
			..Default::default()
		};
		let page = select(&orders, &names, &query, &QueryConfig::default()).unwrap();
		assert_eq!(ids(&page), vec!["o2"]);

		let query = OrderQuery {
			scheduled_from: Some(at(10) - Duration::hours(1)),
			..Default::default()
		};
		let page = select(&orders, &names, &query, &QueryConfig::default()).unwrap();
		assert_eq!(ids(&page), vec!["o3"]);
	}

	#[test]
	fn test_search_is_case_insensitive() {
		let (orders, names) = fixture();
		let search = |s: &str| OrderQuery {
			search: Some(s.into()),
			..Default::default()
		};
		let config = QueryConfig::default();
		assert_eq!(ids(&select(&orders, &names, &search("back door"), &config).unwrap()), vec!["o2"]);
		assert_eq!(
			ids(&select(&orders, &names, &search("nena"), &config).unwrap()),
			vec!["o3", "o1"]
		);
		assert_eq!(ids(&select(&orders, &names, &search("O4"), &config).unwrap()), vec!["o4"]);
	}

	#[test]
	fn test_sort_by_total_ascending() {
		let (orders, names) = fixture();
		let query = OrderQuery {
			sort_by: Some(OrderSortField::Total),
			direction: Some(SortDirection::Asc),
			..Default::default()
		};
		let page = select(&orders, &names, &query, &QueryConfig::default()).unwrap();
		assert_eq!(ids(&page), vec!["o2", "o3", "o4", "o1"]);
	}

	#[test]
	fn test_paging_and_size_clamp() {
		let (orders, names) = fixture();
		let config = QueryConfig {
			default_page_size: 2,
			max_page_size: 3,
		};
		let page = select(
			&orders,
			&names,
			&OrderQuery {
				page: Some(2),
				..Default::default()
			},
			&config,
		)
		.unwrap();
		assert_eq!(ids(&page), vec!["o2", "o1"]);
		assert_eq!(page.total, 4);

		let page = select(
			&orders,
			&names,
			&OrderQuery {
				size: Some(500),
				..Default::default()
			},
			&config,
		)
		.unwrap();
		assert_eq!(page.size, 3);
		assert_eq!(page.items.len(), 3);

		let beyond = select(
			&orders,
			&names,
			&OrderQuery {
				page: Some(9),
				..Default::default()
			},
			&config,
		)
		.unwrap();
		assert!(beyond.items.is_empty());

		let err = select(
			&orders,
			&names,
			&OrderQuery {
				page: Some(0),
				..Default::default()
			},
			&config,
		)
		.unwrap_err();
		assert!(matches!(err, DepotError::Validation(_)));
	}
}
