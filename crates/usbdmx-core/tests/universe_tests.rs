use proptest::prelude::*;
use usbdmx_core::{ChannelValue, Universe, UniverseError, UNIVERSE_SIZE};

#[test]
fn test_universe_default() {
    let universe = Universe::default();
    assert_eq!(universe.to_vec(), vec![0u8; UNIVERSE_SIZE]);
}

#[test]
fn test_rgb_update_snapshot() {
    let mut universe = Universe::new();
    let snapshot = universe.update(1, vec![255u8, 0, 0]).unwrap();

    assert_eq!(&snapshot[..3], &[255, 0, 0]);
    assert!(snapshot[3..].iter().all(|&v| v == 0));
}

#[test]
fn test_channel_value_len() {
    assert_eq!(ChannelValue::from(3u8).len(), 1);
    assert_eq!(ChannelValue::from(vec![1u8, 2, 3]).len(), 3);
    assert!(ChannelValue::Multi(Vec::new()).is_empty());
}

proptest! {
    #[test]
    fn prop_single_update_touches_one_channel(channel in 1u16..=512, value: u8) {
        let mut universe = Universe::from_slice(&[7u8; UNIVERSE_SIZE]).unwrap();
        let snapshot = *universe.update(channel, value).unwrap();

        prop_assert_eq!(snapshot.len(), UNIVERSE_SIZE);
        for (i, v) in snapshot.iter().enumerate() {
            if i == channel as usize - 1 {
                prop_assert_eq!(*v, value);
            } else {
                prop_assert_eq!(*v, 7);
            }
        }
    }

    #[test]
    fn prop_multi_update_in_range(
        (channel, values) in (1u16..=512).prop_flat_map(|c| {
            let room = UNIVERSE_SIZE - (c as usize - 1);
            (Just(c), prop::collection::vec(any::<u8>(), 1..=room.min(32)))
        })
    ) {
        let mut universe = Universe::new();
        let snapshot = *universe.update(channel, values.clone()).unwrap();

        let start = channel as usize - 1;
        prop_assert_eq!(&snapshot[start..start + values.len()], values.as_slice());
        prop_assert!(snapshot[..start].iter().all(|&v| v == 0));
        prop_assert!(snapshot[start + values.len()..].iter().all(|&v| v == 0));
    }

    #[test]
    fn prop_multi_update_past_end_is_rejected(
        (channel, values) in (1u16..=512).prop_flat_map(|c| {
            let room = UNIVERSE_SIZE - (c as usize - 1);
            (Just(c), prop::collection::vec(any::<u8>(), room + 1..=room + 8))
        })
    ) {
        let mut universe = Universe::new();
        let len = values.len();
        let result = universe.update(channel, values);

        prop_assert_eq!(result, Err(UniverseError::OutOfRange { channel, len }));
        prop_assert_eq!(universe, Universe::new());
    }
}
