use std::sync::Arc;
use usbdmx_control::usb::protocol::line_state;
use usbdmx_control::usb::{
    ControlSetup, DeviceFilter, MockCall, MockDevice, MockStep, MockTransport, Recipient,
    RequestType,
};
use usbdmx_control::{ControlError, DeviceSession, SessionState, Stage};

fn ready_session(device: MockDevice) -> (DeviceSession, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    transport.add_selectable(device);
    (DeviceSession::new(transport.clone()), transport)
}

#[tokio::test]
async fn test_send_on_idle_makes_no_transport_call() {
    let transport = Arc::new(MockTransport::new());
    let device = MockDevice::new(0x2341, 0x8036);
    let log = device.log();
    transport.add_paired(device);

    let mut session = DeviceSession::new(transport.clone());
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.device_info().is_none());

    assert!(matches!(
        session.send(&[0u8; 512]).await,
        Err(ControlError::NotConnected)
    ));
    assert!(log.is_empty());
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_connect_call_order() {
    let device = MockDevice::new(0x2a03, 0x8040);
    let log = device.log();
    let (mut session, _) = ready_session(device);

    session.enable().await.unwrap();
    assert_eq!(session.state(), SessionState::Open);
    session.connect().await.unwrap();
    assert_eq!(session.state(), SessionState::Ready);

    assert_eq!(
        log.calls(),
        vec![
            MockCall::Open,
            MockCall::SelectConfiguration(1),
            MockCall::ClaimInterface(2),
            MockCall::ControlTransferOut(ControlSetup {
                request_type: RequestType::Class,
                recipient: Recipient::Interface,
                request: 0x22,
                value: 0x01,
                index: 0x02,
            }),
        ]
    );
}

#[tokio::test]
async fn test_connect_aborts_at_failing_step() {
    let cases = [
        (MockStep::Open, Stage::Open, 1),
        (MockStep::SelectConfiguration, Stage::SelectConfiguration, 2),
        (MockStep::ClaimInterface, Stage::ClaimInterface, 3),
        (MockStep::ControlTransferOut, Stage::Handshake, 4),
    ];

    for (step, stage, calls) in cases {
        let device = MockDevice::new(0x2341, 0x8036).failing_at(step);
        let log = device.log();
        let (mut session, _) = ready_session(device);

        session.enable().await.unwrap();
        let err = session.connect().await.unwrap_err();

        assert_eq!(err.stage(), Some(stage), "failing at {:?}", step);
        assert_eq!(log.len(), calls, "failing at {:?}", step);
        assert_eq!(session.state(), SessionState::Faulted);
        assert!(matches!(
            session.send(&[0u8; 512]).await,
            Err(ControlError::NotConnected)
        ));
        assert_eq!(log.len(), calls);
    }
}

#[tokio::test]
async fn test_interface_held_elsewhere() {
    let (mut session, _) = ready_session(MockDevice::new(0x2886, 0x8002).with_busy_interface(2));

    session.enable().await.unwrap();
    let err = session.connect().await.unwrap_err();

    assert!(matches!(
        err,
        ControlError::InterfaceUnavailable { interface: 2 }
    ));
    assert_eq!(session.state(), SessionState::Faulted);
}

#[tokio::test]
async fn test_enable_cancelled_by_user() {
    let (mut session, transport) = ready_session(MockDevice::new(0x2341, 0x8036));
    transport.cancel_next();

    assert!(matches!(
        session.enable().await,
        Err(ControlError::NoDeviceSelected)
    ));
    assert_eq!(session.state(), SessionState::Idle);

    // The device is still on offer for the next attempt
    session.enable().await.unwrap();
    assert_eq!(session.state(), SessionState::Open);
}

#[tokio::test]
async fn test_custom_filters_are_presented() {
    let filters = vec![DeviceFilter::new(0x1209, 0x0001)];
    let transport = Arc::new(MockTransport::new());
    transport.add_selectable(MockDevice::new(0x2341, 0x8036));
    transport.add_selectable(MockDevice::new(0x1209, 0x0001));

    let mut session = DeviceSession::with_filters(transport.clone(), filters.clone());
    session.enable().await.unwrap();

    assert_eq!(transport.requests(), vec![filters]);
    assert_eq!(session.device_info().map(|i| i.vendor_id), Some(0x1209));
}

#[tokio::test]
async fn test_auto_connect_without_pairing() {
    let transport = Arc::new(MockTransport::new());
    let mut session = DeviceSession::new(transport);

    assert!(matches!(
        session.auto_connect().await,
        Err(ControlError::NoPairedDevice)
    ));
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_auto_connect_uses_first_paired_device() {
    let transport = Arc::new(MockTransport::new());
    let first = MockDevice::new(0x2341, 0x8036);
    let second = MockDevice::new(0x2a03, 0x8036);
    let first_log = first.log();
    let second_log = second.log();
    transport.add_paired(first);
    transport.add_paired(second);

    let mut session = DeviceSession::new(transport.clone());
    session.auto_connect().await.unwrap();

    assert!(session.is_ready());
    assert_eq!(first_log.len(), 4);
    assert!(second_log.is_empty());
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_configured_device_skips_select_configuration() {
    let transport = Arc::new(MockTransport::new());
    let device = MockDevice::new(0x2341, 0x8036).configured(1);
    let log = device.log();
    transport.add_paired(device);

    let mut session = DeviceSession::new(transport);
    session.auto_connect().await.unwrap();

    assert!(!log
        .calls()
        .iter()
        .any(|c| matches!(c, MockCall::SelectConfiguration(_))));
}

#[tokio::test]
async fn test_disconnect_sequence() {
    let device = MockDevice::new(0x2341, 0x8036);
    let log = device.log();
    let (mut session, _) = ready_session(device);

    session.enable().await.unwrap();
    session.connect().await.unwrap();
    session.send(&[7u8; 512]).await.unwrap();
    session.disconnect().await.unwrap();

    let calls = log.calls();
    assert_eq!(
        &calls[calls.len() - 2..],
        &[MockCall::ControlTransferOut(line_state(false)), MockCall::Close]
    );
    if let MockCall::ControlTransferOut(setup) = &calls[calls.len() - 2] {
        assert_eq!(setup.value, 0x00);
        assert_eq!(setup.index, 0x02);
    }

    assert_eq!(session.state(), SessionState::Idle);
    let before = log.len();
    assert!(matches!(
        session.send(&[0u8; 512]).await,
        Err(ControlError::NotConnected)
    ));
    assert_eq!(log.len(), before);
}

#[tokio::test]
async fn test_disconnect_faulted_session_only_closes() {
    let device = MockDevice::new(0x2341, 0x8036).failing_at(MockStep::ControlTransferOut);
    let log = device.log();
    let (mut session, _) = ready_session(device);

    session.enable().await.unwrap();
    assert_eq!(
        session.connect().await.unwrap_err().stage(),
        Some(Stage::Handshake)
    );

    session.disconnect().await.unwrap();
    assert_eq!(log.calls().last(), Some(&MockCall::Close));
    assert_eq!(session.state(), SessionState::Faulted);
    assert!(!session.has_device());
}

#[tokio::test]
async fn test_disconnect_release_failure() {
    let device = MockDevice::new(0x2341, 0x8036).failing_at(MockStep::Close);
    let log = device.log();
    let (mut session, _) = ready_session(device);

    session.enable().await.unwrap();
    session.connect().await.unwrap();

    let err = session.disconnect().await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Close));
    assert_eq!(session.state(), SessionState::Faulted);
    assert_eq!(
        &log.calls()[4..],
        &[MockCall::ControlTransferOut(line_state(false)), MockCall::Close]
    );
}

#[tokio::test]
async fn test_enable_transport_failure() {
    let device = MockDevice::new(0x2341, 0x8036);
    let log = device.log();
    let (mut session, transport) = ready_session(device);
    transport.fail_next_request();

    let err = session.enable().await.unwrap_err();
    assert!(matches!(
        err,
        ControlError::TransportFailure {
            stage: Stage::Select,
            ..
        }
    ));
    assert_eq!(err.stage(), Some(Stage::Select));
    assert_eq!(session.state(), SessionState::Idle);
    assert!(!session.has_device());
    assert!(log.is_empty());
    assert!(transport.paired().is_empty());

    session.enable().await.unwrap();
    assert_eq!(session.state(), SessionState::Open);
}

#[tokio::test]
async fn test_selected_device_reconnects_after_disconnect() {
    let device = MockDevice::new(0x2341, 0x8036);
    let log = device.log();
    let (mut session, _) = ready_session(device);

    session.enable().await.unwrap();
    session.connect().await.unwrap();
    session.disconnect().await.unwrap();

    session.auto_connect().await.unwrap();
    assert!(session.is_ready());

    let opens = log
        .calls()
        .iter()
        .filter(|c| matches!(c, MockCall::Open))
        .count();
    assert_eq!(opens, 2);
}

#[tokio::test]
async fn test_auto_connect_again_after_disconnect() {
    let transport = Arc::new(MockTransport::new());
    let device = MockDevice::new(0x2341, 0x8036);
    let log = device.log();
    transport.add_paired(device);

    let mut session = DeviceSession::new(transport.clone());
    session.auto_connect().await.unwrap();
    session.disconnect().await.unwrap();
    assert_eq!(session.state(), SessionState::Idle);

    session.auto_connect().await.unwrap();
    assert!(session.is_ready());
    assert_eq!(log.calls().last(), Some(&MockCall::ControlTransferOut(line_state(true))));
    assert_eq!(transport.paired().len(), 1);
    assert!(transport.requests().is_empty());
}
