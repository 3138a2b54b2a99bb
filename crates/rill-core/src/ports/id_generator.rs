//! IdGenerator port - ID 生成の抽象化
//!
//! Record ids and generated stream names are ULIDs. Generation goes through
//! the `Clock` port so tests with a `FixedClock` get a predictable time part.

use crate::domain::ids::RecordId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は分散システムで使える ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数スレッドから使える）
pub trait IdGenerator: Send + Sync {
    fn generate_record_id(&self) -> RecordId;

    /// Suffix used when a stream is created without a name.
    fn generate_name_suffix(&self) -> String;
}

/// UlidGenerator は ULID ベースの ID 生成器
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_record_id(&self) -> RecordId {
        RecordId::from_ulid(self.next())
    }

    fn generate_name_suffix(&self) -> String {
        self.next().to_string().to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);

        let id1 = id_gen.generate_record_id();
        let id2 = id_gen.generate_record_id();

        assert_ne!(id1, id2);
    }

    #[test]
    fn ulid_generator_with_fixed_clock_shares_time_part() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = Ulid::from_string(id_gen.generate_record_id().as_str()).unwrap();
        let id2 = Ulid::from_string(id_gen.generate_record_id().as_str()).unwrap();

        // ランダム部分があるので ID は異なるが、timestamp 部分は同じ
        assert_ne!(id1, id2);
        assert_eq!(id1.timestamp_ms(), id2.timestamp_ms());
        assert_eq!(id1.timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }

    #[test]
    fn name_suffix_is_lowercase() {
        let id_gen = UlidGenerator::new(SystemClock);
        let suffix = id_gen.generate_name_suffix();
        assert_eq!(suffix.len(), 26);
        assert_eq!(suffix, suffix.to_ascii_lowercase());
    }
}
