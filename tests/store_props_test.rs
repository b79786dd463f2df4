use proptest::prelude::*;
use std::sync::Arc;

use gateway_console::clock::ManualClock;
use gateway_console::{ExpiringStore, StoreKey};

const HOUR: i64 = 3_600_000;

fn any_key() -> impl Strategy<Value = StoreKey> {
    prop::sample::select(StoreKey::ALL.to_vec())
}

proptest! {
    #[test]
    fn entry_visible_until_expiry(
        key in any_key(),
        value in "[a-zA-Z0-9]{1,32}",
        ttl_hours in 1u64..48,
        elapsed in 0i64..(50 * HOUR),
    ) {
        let clock = ManualClock::new(1_700_000_000_000);
        let store = ExpiringStore::in_memory(Arc::new(clock.clone())).unwrap();

        store.set(key, value.as_str(), ttl_hours).unwrap();
        clock.advance_millis(elapsed);

        let read = store.get_string(key).unwrap();
        if elapsed <= ttl_hours as i64 * HOUR {
            prop_assert_eq!(read, Some(value));
        } else {
            prop_assert_eq!(read, None);
            prop_assert!(store.peek_entry(key).unwrap().is_none());
        }
    }

    #[test]
    fn keys_do_not_interfere(values in prop::collection::vec("[a-z]{1,8}", 4)) {
        let store = ExpiringStore::in_memory(Arc::new(ManualClock::new(0))).unwrap();
        for (key, value) in StoreKey::ALL.iter().zip(&values) {
            store.set(*key, value.as_str(), 6).unwrap();
        }

        store.remove(StoreKey::Token).unwrap();

        for (key, value) in StoreKey::ALL.iter().zip(&values) {
            let expected = if *key == StoreKey::Token { None } else { Some(value.clone()) };
            prop_assert_eq!(store.get_string(*key).unwrap(), expected);
        }
    }
}
