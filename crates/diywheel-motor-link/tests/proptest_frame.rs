//! Property-based tests for command frames and the gateway datagram layout.

#[cfg(test)]
mod proptest_frame {
    use diywheel_motor_link::{
        CanFrame, DATAGRAM_LEN, MAX_PAYLOAD, decode_datagram, encode_datagram,
    };
    use proptest::collection::vec;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        // --- Command frames survive the gateway unchanged ---

        #[test]
        fn command_frame_crosses_gateway(
            id in 0u16..0x800,
            cmd in any::<u8>(),
            payload in vec(any::<u8>(), 0..MAX_PAYLOAD),
        ) {
            let frame = CanFrame::command(id, cmd, &payload)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(frame.id(), id);
            prop_assert_eq!(frame.command_code(), Some(cmd));
            prop_assert_eq!(frame.data().get(1..), Some(payload.as_slice()));

            let datagram = encode_datagram(&frame);
            prop_assert_eq!(datagram.len(), DATAGRAM_LEN);
            prop_assert_eq!(decode_datagram(&datagram), Some(frame));
        }

        // --- A command never fits more than the frame carries ---

        #[test]
        fn oversized_command_rejected(
            cmd in any::<u8>(),
            payload in vec(any::<u8>(), MAX_PAYLOAD..32),
        ) {
            prop_assert!(CanFrame::command(0x141, cmd, &payload).is_err());
        }

        // --- Arbitrary bytes either decode to a bounded frame or nothing ---

        #[test]
        fn decode_never_exceeds_payload(bytes in vec(any::<u8>(), 0..40)) {
            let header = bytes.get(..3).unwrap_or_default();
            match (decode_datagram(&bytes), header) {
                (Some(frame), &[lo, hi, len]) => {
                    prop_assert!(bytes.len() >= DATAGRAM_LEN);
                    prop_assert_eq!(frame.data().len(), usize::from(len));
                    prop_assert_eq!(frame.id(), u16::from_le_bytes([lo, hi]) & 0x7FF);
                }
                (Some(_), _) => prop_assert!(false, "decoded a {}-byte datagram", bytes.len()),
                (None, &[_, _, len]) if bytes.len() >= DATAGRAM_LEN => {
                    prop_assert!(usize::from(len) > MAX_PAYLOAD);
                }
                (None, _) => {}
            }
        }
    }
}
