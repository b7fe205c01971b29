//! Named groups of live primitives.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::primitive::{COMPOSITE_TIMEOUT, Primitive, Shape};

#[derive(Debug, Default)]
struct Group {
	live: Vec<Primitive>,
	/// Staging buffer while the group is frozen.
	frozen: Option<Vec<Primitive>>,
	z: i32,
}

impl Group {
	fn is_empty(&self) -> bool {
		self.live.is_empty() && self.frozen.is_none() && self.z == 0
	}
}

/// Owns every primitive on the overlay, keyed by group name.
#[derive(Debug, Default)]
pub struct GroupStore {
	current: String,
	groups: BTreeMap<String, Group>,
}

impl GroupStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Group that draws attach to. Starts out as `""`.
	pub fn current(&self) -> &str {
		&self.current
	}

	pub fn set_current(&mut self, name: &str) {
		self.current = name.to_string();
	}

	/// Remove every live and staged primitive of `name`.
	pub fn clear(&mut self, name: &str) {
		self.groups.remove(name);
	}

	/// Start staging draws for `name`. Freezing twice keeps the first buffer.
	pub fn freeze(&mut self, name: &str) {
		let group = self.groups.entry(name.to_string()).or_default();
		if group.frozen.is_none() {
			group.frozen = Some(Vec::new());
		}
	}

	/// Flush the staging buffer of `name` as one composite primitive.
	pub fn continue_group(&mut self, name: &str, now: Instant) {
		let Some(group) = self.groups.get_mut(name) else {
			return;
		};
		let Some(staged) = group.frozen.take() else {
			return;
		};
		if !staged.is_empty() {
			group.live.push(Primitive::new(Shape::Composite(staged), group.z, COMPOSITE_TIMEOUT, now));
		}
	}

	pub fn refresh(&mut self, name: &str, now: Instant) {
		self.continue_group(name, now);
		self.freeze(name);
	}

	/// Restack `name`, including primitives drawn into it later.
	pub fn set_z(&mut self, name: &str, z: i32) {
		let group = self.groups.entry(name.to_string()).or_default();
		group.z = z;
		group
			.live
			.iter_mut()
			.chain(group.frozen.iter_mut().flatten())
			.for_each(|p| p.set_z(z));
	}

	/// Add a primitive to the current group, staged if the group is frozen.
	pub fn draw(&mut self, shape: Shape, timeout: Duration, now: Instant) {
		let group = self.groups.entry(self.current.clone()).or_default();
		let primitive = Primitive::new(shape, group.z, timeout, now);
		match &mut group.frozen {
			Some(staged) => staged.push(primitive),
			None => group.live.push(primitive),
		}
	}

	/// Forget every group and return to the default group.
	pub fn reset(&mut self) {
		self.groups.clear();
		self.current.clear();
	}

	/// Drop expired primitives. Returns how many top-level primitives were removed.
	pub fn tick(&mut self, now: Instant) -> usize {
		let mut removed = 0;
		for group in self.groups.values_mut() {
			let before = group.live.len() + group.frozen.as_ref().map_or(0, Vec::len);
			group.live.retain_mut(|p| p.prune(now));
			if let Some(staged) = &mut group.frozen {
				staged.retain_mut(|p| p.prune(now));
			}
			removed += before - group.live.len() - group.frozen.as_ref().map_or(0, Vec::len);
		}
		self.groups.retain(|_, group| !group.is_empty());
		removed
	}

	pub fn next_deadline(&self) -> Option<Instant> {
		self.groups
			.values()
			.flat_map(|g| g.live.iter().chain(g.frozen.iter().flatten()))
			.map(Primitive::next_deadline)
			.min()
	}

	pub fn live(&self, name: &str) -> &[Primitive] {
		self.groups.get(name).map(|g| g.live.as_slice()).unwrap_or_default()
	}

	pub fn staged(&self, name: &str) -> &[Primitive] {
		self.groups
			.get(name)
			.and_then(|g| g.frozen.as_deref())
			.unwrap_or(&[])
	}

	pub fn is_frozen(&self, name: &str) -> bool {
		self.groups.get(name).is_some_and(|g| g.frozen.is_some())
	}

	/// All shown primitives, bottom first. Equal z keeps group name then draw order.
	pub fn visible(&self) -> Vec<&Primitive> {
		let mut out = self.groups.values().flat_map(|g| g.live.iter()).collect::<Vec<_>>();
		out.sort_by_key(|p| p.z);
		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use ie::Rgba;

	const LONG: Duration = Duration::from_secs(10);

	fn dot(x: i32) -> Shape {
		Shape::Rect { color: Rgba::new(0, 255, 0, 255), x, y: 0, width: 1, height: 1, line_width: 1 }
	}

	#[test]
	fn test_draws_land_in_current_group() {
		let now = Instant::now();
		let mut store = GroupStore::new();
		store.draw(dot(0), LONG, now);
		store.set_current("hud");
		store.draw(dot(1), LONG, now);
		store.draw(dot(2), LONG, now);

		assert_eq!(store.live("").len(), 1);
		assert_eq!(store.live("hud").len(), 2);

		store.clear("hud");
		assert!(store.live("hud").is_empty());
		assert_eq!(store.current(), "hud");
	}

	#[test]
	fn test_freeze_then_continue_is_atomic() {
		let now = Instant::now();
		let mut store = GroupStore::new();
		store.set_current("x");
		store.freeze("x");
		store.freeze("x");
		for i in 0..3 {
			store.draw(dot(i), LONG, now);
			assert!(store.live("x").is_empty());
		}
		assert_eq!(store.staged("x").len(), 3);

		store.continue_group("x", now);
		assert!(!store.is_frozen("x"));
		let live = store.live("x");
		assert_eq!(live.len(), 1);
		let Shape::Composite(children) = &live[0].shape else {
			panic!("expected a composite");
		};
		assert_eq!(children.len(), 3);
		assert_eq!(live[0].expires_at, now + COMPOSITE_TIMEOUT);
	}

	#[test]
	fn test_refresh_refreezes() {
		let now = Instant::now();
		let mut store = GroupStore::new();
		store.freeze("");
		store.draw(dot(0), LONG, now);
		store.refresh("", now);

		assert_eq!(store.live("").len(), 1);
		assert!(store.is_frozen(""));
		store.draw(dot(1), LONG, now);
		assert_eq!(store.live("").len(), 1);
		assert_eq!(store.staged("").len(), 1);
	}

	#[test]
	fn test_continue_without_freeze_does_nothing() {
		let now = Instant::now();
		let mut store = GroupStore::new();
		store.draw(dot(0), LONG, now);
		store.continue_group("", now);
		store.continue_group("missing", now);
		assert_eq!(store.live("").len(), 1);
	}

	#[test]
	fn test_tick_expires() {
		let now = Instant::now();
		let mut store = GroupStore::new();
		store.draw(dot(0), Duration::from_millis(5), now);
		store.draw(dot(1), LONG, now);
		assert_eq!(store.next_deadline(), Some(now + Duration::from_millis(5)));

		assert_eq!(store.tick(now + Duration::from_millis(5)), 1);
		assert_eq!(store.live("").len(), 1);
		assert_eq!(store.tick(now + LONG), 1);
		assert_eq!(store.next_deadline(), None);
	}

	#[test]
	fn test_z_order() {
		let now = Instant::now();
		let mut store = GroupStore::new();
		store.set_current("top");
		store.draw(dot(0), LONG, now);
		store.set_current("bottom");
		store.draw(dot(1), LONG, now);

		store.set_z("top", 5);
		store.set_z("bottom", -1);
		store.set_current("top");
		store.draw(dot(2), LONG, now);

		let xs = store
			.visible()
			.iter()
			.map(|p| match p.shape {
				Shape::Rect { x, .. } => x,
				_ => unreachable!(),
			})
			.collect::<Vec<_>>();
		assert_eq!(xs, vec![1, 0, 2]);
	}
}
