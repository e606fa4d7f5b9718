//! Property-based tests for the FLASH settings log.
//! Arbitrary store sequences must always leave every stored location
//! recallable with its latest image, within the sector bound.

use flash_log::{FlashLog, Identity, LogHealth, SectorProgrammer, MAX_RECORDS, STAGING_WORDS};
use params::descriptor::id;
use params::{Context, ParamStore, SerialNumber};
use platform::config::LAST_MEM_LOC;
use platform::mocks::MockFlash;

fn fresh_log() -> FlashLog<MockFlash> {
    let sn = SerialNumber::parse("1320013414").unwrap();
    FlashLog::new(SectorProgrammer::new(MockFlash::new()), Identity::of(&sn))
}

fn image(marker: i32) -> ParamStore {
    let mut s = ParamStore::factory();
    s.put(id::BP_F1, Context::B, marker);
    s.set_user_fir_tap(Context::A, 255, i16::try_from(marker % 30_000).unwrap());
    s
}

proptest::proptest! {
    #![proptest_config(proptest::prelude::ProptestConfig::with_cases(48))]

    /// Every location recalls the image of its most recent store, however
    /// many compactions happened on the way.
    #[test]
    fn latest_store_wins(seq in proptest::collection::vec(0u16..=LAST_MEM_LOC, 1..40)) {
        let mut log = fresh_log();
        let mut buf = vec![0u16; STAGING_WORDS];
        let mut latest = [None; LAST_MEM_LOC as usize + 1];
        for (i, &loc) in seq.iter().enumerate() {
            let marker = i32::try_from(i).unwrap() * 7 + 1;
            log.store(loc, &image(marker), &mut buf).unwrap();
            latest[usize::from(loc)] = Some(marker);

            let recs = log.live_records().unwrap();
            assert!(recs.len() <= MAX_RECORDS);
            assert!(log.programmer().is_locked());
        }

        for (loc, expect) in latest.iter().enumerate() {
            let loc = u16::try_from(loc).unwrap();
            let mut into = ParamStore::zeroed();
            match expect {
                Some(marker) => {
                    log.recall(loc, &mut into, &mut buf).unwrap();
                    assert!(into.same_values(&image(*marker)), "location {}", loc);
                }
                None => assert!(log.recall(loc, &mut into, &mut buf).is_err()),
            }
        }
        assert!(matches!(log.startup_scan().unwrap(), LogHealth::Healthy { .. }));
    }

    /// Store then recall of the same location reproduces the image exactly,
    /// and a second recall changes nothing.
    #[test]
    fn store_recall_round_trip(loc in 0u16..=LAST_MEM_LOC, marker in -1_000_000i32..1_000_000) {
        let mut log = fresh_log();
        let mut buf = vec![0u16; STAGING_WORDS];
        let original = image(marker);
        log.store(loc, &original, &mut buf).unwrap();

        let mut once = ParamStore::zeroed();
        log.recall(loc, &mut once, &mut buf).unwrap();
        assert!(once.same_values(&original));

        let mut twice = once.clone();
        log.recall(loc, &mut twice, &mut buf).unwrap();
        assert!(twice.same_values(&once));
    }
}
