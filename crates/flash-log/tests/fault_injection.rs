//! Device-fault behaviour of the settings log: every FLASH failure is
//! surfaced with its operator code and stage, and leaves earlier records
//! intact unless it hit the compaction erase.

use flash_log::{FlashLog, Identity, LogError, LogHealth, SectorProgrammer, Stage, STAGING_WORDS};
use params::descriptor::id;
use params::{Context, ParamStore, SerialNumber};
use platform::mocks::MockFlash;
use platform::FlashError;

fn setup() -> (FlashLog<MockFlash>, Vec<u16>) {
    let sn = SerialNumber::parse("1320013414").unwrap();
    let log = FlashLog::new(SectorProgrammer::new(MockFlash::new()), Identity::of(&sn));
    (log, vec![0u16; STAGING_WORDS])
}

fn image(marker: i32) -> ParamStore {
    let mut s = ParamStore::factory();
    s.put(id::HP_FCUT, Context::Common, marker);
    s
}

#[test]
fn append_failure_keeps_previous_records() {
    let (mut log, mut buf) = setup();
    log.store(0, &image(1), &mut buf).unwrap();
    log.programmer()
        .device_mut()
        .fail_next_write(FlashError::ProgramTimeout);
    let err = log.store(0, &image(2), &mut buf).unwrap_err();
    assert_eq!(
        err,
        LogError::Flash {
            stage: Stage::Append,
            error: FlashError::ProgramTimeout
        }
    );
    if let LogError::Flash { error, stage } = err {
        assert_eq!(error.code(), 5);
        assert_eq!(stage.label(), "inStore2");
    }

    let mut into = ParamStore::zeroed();
    log.recall(0, &mut into, &mut buf).unwrap();
    assert_eq!(into.get(id::HP_FCUT, Context::Common), 1);
}

#[test]
fn erase_verify_failure_during_compaction() {
    let (mut log, mut buf) = setup();
    for loc in [0u16, 1, 2, 3, 4, 0, 1] {
        log.store(loc, &image(i32::from(loc)), &mut buf).unwrap();
    }
    // Byte 0xc100 sits inside the log sector (word 0x6080).
    log.programmer().device_mut().stick_byte(0xc100);
    let err = log.store(2, &image(9), &mut buf).unwrap_err();
    assert_eq!(
        err,
        LogError::Flash {
            stage: Stage::Compact,
            error: FlashError::EraseVerify
        }
    );
    assert!(log.programmer().is_locked());
}

#[test]
fn corruption_then_reseed_recovers() {
    let (mut log, mut buf) = setup();
    log.store(0, &image(5), &mut buf).unwrap();
    log.programmer().device_mut().poke_word(0x6004, 0x1234);
    assert_eq!(log.startup_scan().unwrap(), LogHealth::Corrupt);

    log.store_all(&image(8), &mut buf).unwrap();
    assert_eq!(log.startup_scan().unwrap(), LogHealth::Healthy { records: 5 });
    let mut into = ParamStore::zeroed();
    log.recall(3, &mut into, &mut buf).unwrap();
    assert_eq!(into.get(id::HP_FCUT, Context::Common), 8);
}

#[test]
fn zero_to_one_is_code_four() {
    let (mut log, _) = setup();
    let p = log.programmer();
    p.unlock().program(0x6000, &[0x0000], false).unwrap();
    let err = p.unlock().program(0x6000, &[0x0001], false).unwrap_err();
    assert_eq!(err, FlashError::ProgramZeroToOne);
    assert_eq!(err.code(), 4);
}
