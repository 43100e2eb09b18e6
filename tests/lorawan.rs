use lorawan_packet::creator::{
    DataPayloadCreator, Error as CreatorError, JoinAcceptCreator, JoinRequestCreator,
};
use lorawan_packet::default_crypto::DefaultFactory;
use lorawan_packet::keys::*;
use lorawan_packet::parser::*;
use lorawan_packet::types::Frequency;
use lorawan_packet::Error;

fn phy_join_request_payload() -> Vec<u8> {
    vec![
        0x00, 0x04, 0x03, 0x02, 0x01, 0x04, 0x03, 0x02, 0x01, 0x05, 0x04, 0x03, 0x02, 0x05, 0x04,
        0x03, 0x02, 0x2d, 0x10, 0x6a, 0x99, 0x0e, 0x12,
    ]
}

fn phy_join_accept_payload() -> Vec<u8> {
    vec![
        0x20, 0x49, 0x3e, 0xeb, 0x51, 0xfb, 0xa2, 0x11, 0x6f, 0x81, 0x0e, 0xdb, 0x37, 0x42, 0x97,
        0x51, 0x42,
    ]
}

fn phy_join_accept_payload_with_c_f_list() -> Vec<u8> {
    vec![
        0x20, 0xe4, 0x56, 0x73, 0xb6, 0x3c, 0xb4, 0xb9, 0xce, 0xcb, 0x2a, 0xa8, 0x3f, 0x03, 0x33,
        0xe6, 0x15, 0xd2, 0xac, 0x89, 0xee, 0xa1, 0x65, 0x98, 0x37, 0xc3, 0xaa, 0x6d, 0xf9, 0x68,
        0x98, 0x89, 0xcf,
    ]
    //867100000, 867300000, 867500000, 867700000, 867900000
}

fn phy_dataup_payload() -> Vec<u8> {
    vec![
        0x40, 0x04, 0x03, 0x02, 0x01, 0x80, 0x01, 0x00, 0x01, 0xa6, 0x94, 0x64, 0x26, 0x15, 0xd6,
        0xc3, 0xb5, 0x82,
    ]
}

fn phy_long_dataup_payload() -> Vec<u8> {
    vec![
        0x40, 0x04, 0x03, 0x02, 0x01, 0x00, 0x00, 0x00, 0x01, 0x27, 0x5a, 0xe9, 0x94, 0x2a, 0x58,
        0x32, 0x21, 0x48, 0xba, 0xd6, 0xca, 0x7d, 0x74, 0x6e, 0x77, 0x4a, 0xf8, 0x66, 0x7a, 0x7b,
        0x72, 0x36, 0x4b, 0xe4, 0xe1, 0x9d, 0x2f, 0x5c, 0x23, 0x98, 0x4f, 0xe2, 0x5e, 0x8e, 0x2d,
        0xdb, 0xd5, 0x15, 0xb5, 0x4e, 0xbe, 0x80, 0xce, 0xc2, 0x1c, 0xd6, 0x5a, 0x88, 0x13, 0x0f,
        0xbe, 0x6d, 0x04, 0xaa, 0xb2, 0xbc, 0x39, 0xab, 0xbe, 0xd9, 0xe8, 0x73, 0xef, 0xc7, 0x85,
        0xe5, 0x65, 0x5d, 0x62, 0x72, 0xf8, 0x79, 0x6b, 0x1e, 0x83, 0x9f, 0x2b, 0x1b, 0xde, 0xab,
        0xa2, 0x01, 0x6c, 0x7e, 0xf9, 0x16, 0x9d, 0x51, 0xf4, 0xea, 0x26, 0x1b, 0xc6, 0x08, 0x9c,
        0x83, 0xb3, 0x3c, 0x6f, 0x30, 0xa7, 0x3c, 0xe1, 0x3c, 0x52, 0x55, 0x7c, 0x46, 0xd7, 0x91,
        0xe7, 0xe0, 0x1b, 0x39, 0xe0, 0xb8, 0x9c, 0x1d, 0x2e, 0x35, 0x08, 0x84, 0x1b, 0x67, 0xe3,
        0xec, 0x88, 0x6f, 0x96, 0xeb, 0x0e, 0x11, 0x16, 0x40, 0xd3, 0xc1, 0x94, 0xf1, 0x21, 0x49,
        0xab, 0x58, 0x4b, 0xd9, 0x31, 0xdc, 0x15, 0xfc, 0x11, 0x94, 0x97, 0xdc, 0xcb, 0xf2, 0xb5,
        0xb9, 0x16, 0xb8, 0x52, 0x42, 0x96, 0x33, 0x41, 0xa5, 0x8b, 0xb5, 0x87, 0x7b, 0xd5, 0xaf,
        0x9e, 0xe4, 0x2d, 0x8b, 0x6f, 0x48, 0x45, 0x85, 0xa6, 0xf9, 0xcb, 0xaf, 0xf7, 0x2e, 0xe1,
        0x09, 0x42, 0xe1, 0x23, 0x8c, 0x98, 0xd7, 0xbf, 0xe7, 0xca, 0x0b, 0x2d, 0xb2, 0x24, 0x8d,
        0xb9, 0x1c, 0xd2, 0x3a, 0x71, 0xc6, 0xdb, 0x9b, 0x76, 0x8c, 0xf7, 0xef, 0x17, 0xf0, 0x51,
        0xcf, 0x42, 0x3e, 0x73, 0x47, 0x7a, 0xbc, 0x9b, 0x0f, 0xf0, 0x62, 0xde, 0x1e, 0x85, 0x20,
        0x29, 0x92, 0xdd, 0xca, 0x58, 0x37, 0x44, 0x19, 0x0c, 0x4f, 0xf7, 0xe1, 0xb4, 0x2e, 0xa3,
        0xcc,
    ]
}

fn long_data_payload() -> String {
    // some text from loremipsum.de with a typo at the end
    String::from(
        "Lorem ipsum dolor sit amet, consetetur sadipscing elitr, sed diam nonumy eirmod tempor \
            invidunt ut labore et dolore magna aliquyam erat, sed diam voluptua. At vero eos et \
            accusam et justo duo dolores et ea rebum. Stet clita kasd gubergren, not",
    )
}

fn phy_datadown_payload() -> Vec<u8> {
    vec![
        0xa0, 0x04, 0x03, 0x02, 0x01, 0x80, 0xff, 0x2a, 0x2a, 0x0a, 0xf1, 0xa3, 0x6a, 0x05, 0xd0,
        0x12, 0x5f, 0x88, 0x5d, 0x88, 0x1d, 0x49, 0xe1,
    ]
}

fn data_payload_with_fport_zero() -> Vec<u8> {
    vec![
        0x40, 0x04, 0x03, 0x02, 0x01, 0x00, 0x00, 0x00, 0x00, 0x69, 0x36, 0x9e, 0xee, 0x6a, 0xa5,
        0x08,
    ]
}

fn data_payload_with_f_opts() -> Vec<u8> {
    vec![
        0x40, 0x04, 0x03, 0x02, 0x01, 0x03, 0x00, 0x00, 0x02, 0x03, 0x05, 0xd7, 0xfa, 0x0c, 0x6c,
    ]
}

fn app_key() -> [u8; 16] {
    [0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]
}

#[test]
fn test_mhdr_mtype() {
    let examples = [
        (0x00, MType::JoinRequest),
        (0x20, MType::JoinAccept),
        (0x40, MType::UnconfirmedDataUp),
        (0x60, MType::UnconfirmedDataDown),
        (0x80, MType::ConfirmedDataUp),
        (0xa0, MType::ConfirmedDataDown),
        (0xc0, MType::RFU),
        (0xe0, MType::Proprietary),
    ];
    for (v, expected) in &examples {
        let mhdr = MHDR::new(*v);
        assert_eq!(mhdr.mtype(), *expected);
    }
}

#[test]
fn test_mhdr_major() {
    let examples = [(0, Major::LoRaWANR1), (1, Major::RFU)];
    for (v, expected) in &examples {
        let mhdr = MHDR::new(*v);
        assert_eq!(mhdr.major(), *expected);
    }
}

#[test]
fn test_mtype_direction() {
    assert_eq!(MType::JoinRequest.direction(), Some(Direction::Uplink));
    assert_eq!(MType::JoinAccept.direction(), Some(Direction::Downlink));
    assert_eq!(MType::UnconfirmedDataUp.direction(), Some(Direction::Uplink));
    assert_eq!(MType::ConfirmedDataDown.direction(), Some(Direction::Downlink));
    assert_eq!(MType::RFU.direction(), None);
    assert_eq!(MType::Proprietary.direction(), None);
}

#[test]
fn test_parse_phy_payload_with_too_few_bytes_is_err() {
    let bytes = vec![0x80, 0x04, 0x03, 0x02, 0x01, 0x00, 0xff, 0x01, 0x02, 0x03, 0x04];
    assert_eq!(parse(bytes), Err(Error::Malformed("length")));
}

#[test]
fn test_parse_phy_payload_with_unsupported_major_version() {
    let bytes = vec![0x81, 0x04, 0x03, 0x02, 0x01, 0x00, 0xff, 0x01, 0x02, 0x03, 0x04, 0x05];
    assert_eq!(parse(bytes), Err(Error::Malformed("major")));
}

#[test]
fn test_parse_join_request_payload() {
    let phy = parse(phy_join_request_payload());
    assert_eq!(
        phy,
        Ok(PhyPayload::JoinRequest(JoinRequestPayload::new(phy_join_request_payload()).unwrap()))
    );
}

#[test]
fn test_parse_join_accept_payload() {
    let phy = parse(phy_join_accept_payload());
    assert_eq!(
        phy,
        Ok(PhyPayload::JoinAccept(JoinAcceptPayload::Encrypted(
            EncryptedJoinAcceptPayload::new(phy_join_accept_payload()).unwrap()
        )))
    );
}

#[test]
fn test_parse_data_payload() {
    let phy = parse(phy_dataup_payload());
    assert_eq!(
        phy,
        Ok(PhyPayload::Data(DataPayload::Encrypted(
            EncryptedDataPayload::new(phy_dataup_payload()).unwrap()
        )))
    );
}

#[test]
fn test_parse_preserves_bytes() {
    let bytes = phy_dataup_payload();
    let phy = parse(bytes.clone()).unwrap();
    assert_eq!(phy.as_ref(), &bytes[..]);
}

#[test]
fn test_parse_data_payload_no_panic_when_bad_packet() {
    let data = vec![0x40, 0x04, 0x03, 0x02, 0x01, 0x85, 0x01, 0x00, 0xd6, 0xc3, 0xb5, 0x82];
    assert_eq!(parse(data), Err(Error::Malformed("length")));
}

#[test]
fn test_parse_data_payload_no_panic_when_too_short_packet() {
    let data = vec![0x40, 0x04, 0x03, 0x02, 0x01];
    assert_eq!(EncryptedDataPayload::new(data), Err(Error::Malformed("length")));
}

#[test]
fn test_parse_rfu_payload_is_rejected_by_default() {
    let data = vec![0xc0; 12];
    assert_eq!(parse(data), Err(Error::Malformed("MType")));
}

fn accept_any_extension(_bytes: &[u8]) -> bool {
    true
}

fn reject_any_extension(_bytes: &[u8]) -> bool {
    false
}

#[test]
fn test_parse_proprietary_payload_with_registered_handler() {
    let data = vec![0xe0; 12];
    let extensions = Extensions::default().with_proprietary(accept_any_extension);
    let phy = parse_with_extensions(data.clone(), DefaultFactory, &extensions).unwrap();
    match phy {
        PhyPayload::Extension(ext) => assert_eq!(ext.as_bytes(), &data[..]),
        _ => panic!("expected an extension payload"),
    }
}

#[test]
fn test_parse_rfu_payload_with_registered_handler() {
    let data = vec![0xc0; 12];
    let extensions = Extensions::default().with_rfu(accept_any_extension);
    let phy = parse_with_extensions(data, DefaultFactory, &extensions).unwrap();
    assert!(matches!(phy, PhyPayload::Extension(_)));
}

#[test]
fn test_parse_extension_payload_vetoed_by_handler() {
    let data = vec![0xe0; 12];
    let extensions = Extensions::default().with_proprietary(reject_any_extension);
    assert_eq!(
        parse_with_extensions(data, DefaultFactory, &extensions),
        Err(Error::Malformed("extension"))
    );
}

#[test]
fn test_parse_proprietary_payload_without_handler_for_its_code() {
    // a handler for RFU does not accept Proprietary frames
    let data = vec![0xe0; 12];
    let extensions = Extensions::default().with_rfu(accept_any_extension);
    assert_eq!(
        parse_with_extensions(data, DefaultFactory, &extensions),
        Err(Error::Malformed("MType"))
    );
}

#[test]
fn test_new_join_accept_payload_too_short() {
    let mut bytes = phy_join_accept_payload();
    bytes.pop();
    assert_eq!(EncryptedJoinAcceptPayload::new(bytes), Err(Error::Malformed("length")));
}

fn decrypted_join_accept_with_c_f_list() -> DecryptedJoinAcceptPayload<Vec<u8>, DefaultFactory> {
    let data = phy_join_accept_payload_with_c_f_list();
    let key = AppKey::from([1; 16]);
    EncryptedJoinAcceptPayload::new(data).unwrap().decrypt(&key)
}

#[test]
fn test_join_accept_app_nonce_extraction() {
    let decrypted_phy = decrypted_join_accept_with_c_f_list();
    let expected = vec![3, 2, 1];
    assert_eq!(decrypted_phy.app_nonce(), AppNonce::new(&expected[..]).unwrap());
}

#[test]
fn test_join_accept_rx_delay_extraction() {
    let decrypted_phy = decrypted_join_accept_with_c_f_list();
    assert_eq!(decrypted_phy.rx_delay(), 3);
}

#[test]
fn test_join_accept_dl_settings_extraction() {
    let decrypted_phy = decrypted_join_accept_with_c_f_list();
    assert_eq!(decrypted_phy.dl_settings(), lorawan_packet::types::DLSettings::new(0x12));
}

#[test]
fn test_dl_settings() {
    let dl_settings = lorawan_packet::types::DLSettings::new(0xcb);
    assert_eq!(dl_settings.rx1_dr_offset(), 4);
    assert_eq!(dl_settings.rx2_data_rate(), 11);
}

#[test]
fn test_join_accept_c_f_list_empty() {
    let data = phy_join_accept_payload();
    let key = AppKey::from(app_key());
    let decrypted_phy = EncryptedJoinAcceptPayload::new(data).unwrap().decrypt(&key);
    assert_eq!(decrypted_phy.c_f_list(), None);
}

#[test]
fn test_join_accept_c_f_list_with_frequencies() {
    let decrypted_phy = decrypted_join_accept_with_c_f_list();

    let expected_c_f_list = CfList::DynamicChannel([
        Frequency::new_from_raw(&[0x18, 0x4F, 0x84]),
        Frequency::new_from_raw(&[0xE8, 0x56, 0x84]),
        Frequency::new_from_raw(&[0xB8, 0x5E, 0x84]),
        Frequency::new_from_raw(&[0x88, 0x66, 0x84]),
        Frequency::new_from_raw(&[0x58, 0x6E, 0x84]),
    ]);
    assert_eq!(decrypted_phy.c_f_list(), Some(expected_c_f_list));
}

#[test]
fn test_mic_extraction() {
    let bytes = &phy_dataup_payload()[..];
    let phy = EncryptedDataPayload::new(bytes);

    assert_eq!(phy.unwrap().mic(), MIC([0xd6, 0xc3, 0xb5, 0x82]));
}

#[test]
fn test_validate_data_mic_when_ok() {
    let phy = EncryptedDataPayload::new(phy_dataup_payload()).unwrap();
    let key = NwkSKey::from([2; 16]);

    assert!(phy.validate_mic(&key, 1));
}

#[test]
fn test_validate_data_mic_when_payload_tampered() {
    let mut bytes = phy_dataup_payload();
    bytes[8] = 0xee;
    let phy = EncryptedDataPayload::new(bytes).unwrap();
    let key = NwkSKey::from([2; 16]);

    assert!(!phy.validate_mic(&key, 1));
}

#[test]
fn test_validate_data_mic_when_mic_tampered() {
    let mut bytes = phy_dataup_payload();
    let len = bytes.len();
    bytes[len - 1] ^= 0x01;
    let phy = EncryptedDataPayload::new(bytes).unwrap();
    let key = NwkSKey::from([2; 16]);

    assert!(!phy.validate_mic(&key, 1));
}

#[test]
fn test_new_data_payload_is_err_if_bytes_too_short() {
    let bytes = &[0x80, 0x04, 0x03, 0x02, 0x01, 0x00, 0xff, 0x01, 0x02, 0x03, 0x04];
    let bytes_with_fopts = &[0x00, 0x04, 0x03, 0x02, 0x01, 0x01, 0xff, 0x04, 0x01, 0x02, 0x03, 0x04];

    assert!(EncryptedDataPayload::new(bytes).is_err());
    assert!(EncryptedDataPayload::new(bytes_with_fopts).is_err());
}

#[test]
fn test_f_port_could_be_absent_in_data_payload() {
    let bytes = &[0x80, 0x04, 0x03, 0x02, 0x01, 0x00, 0xff, 0x04, 0x01, 0x02, 0x03, 0x04];
    let data_payload = EncryptedDataPayload::new(bytes).unwrap();
    assert!(data_payload.f_port().is_none());
}

#[test]
fn test_complete_data_payload_fhdr() {
    let app_skey = AppSKey::from([1; 16]);
    let nwk_skey = NwkSKey::from([2; 16]);
    let phys: Vec<Box<dyn DataHeader>> = vec![
        Box::new(EncryptedDataPayload::new(phy_dataup_payload()).unwrap()),
        Box::new(
            DecryptedDataPayload::new(phy_dataup_payload(), &nwk_skey, Some(&app_skey), 1).unwrap(),
        ),
    ];
    for phy in phys {
        assert_eq!(phy.f_port(), Some(1));

        let fhdr = phy.fhdr();

        assert_eq!(fhdr.dev_addr(), DevAddr::new([4, 3, 2, 1]).unwrap());

        assert_eq!(fhdr.fcnt(), 1u16);

        assert!(fhdr.fopts().is_empty());

        let fctrl = fhdr.fctrl();

        assert_eq!(fctrl.f_opts_len(), 0);

        assert!(!fctrl.f_pending(), "no f_pending");

        assert!(!fctrl.ack(), "no ack");

        assert!(fctrl.adr(), "ADR");
    }
}

#[test]
fn test_complete_dataup_payload_frm_payload() {
    let phy = EncryptedDataPayload::new(phy_dataup_payload()).unwrap();
    let key = AppSKey::from([1; 16]);
    let decrypted = phy.decrypt(None, Some(&key), 1).unwrap();

    assert_eq!(decrypted.frm_payload(), FRMPayload::Data(&b"hello"[..]));
}

#[test]
fn test_complete_long_dataup_payload_frm_payload() {
    let phy = EncryptedDataPayload::new(phy_long_dataup_payload()).unwrap();
    let nwk_skey = NwkSKey::from([2; 16]);
    let app_skey = AppSKey::from([1; 16]);
    let decrypted = phy.decrypt_if_mic_ok(&nwk_skey, &app_skey, 0).unwrap();
    let payload = long_data_payload().into_bytes();

    assert_eq!(decrypted.frm_payload(), FRMPayload::Data(&payload[..]));
}

#[test]
fn test_complete_datadown_payload_frm_payload() {
    let phy = EncryptedDataPayload::new(phy_datadown_payload()).unwrap();
    let key = AppSKey::from([1; 16]);
    let decrypted = phy.decrypt(None, Some(&key), 76543).unwrap();

    assert_eq!(decrypted.frm_payload(), FRMPayload::Data(&b"hello lora"[..]));
}

#[test]
fn test_decrypt_missing_key_is_reported() {
    let phy = EncryptedDataPayload::new(phy_dataup_payload()).unwrap();
    assert_eq!(phy.decrypt(None, None, 1).err(), Some(Error::MissingKey));
}

#[test]
fn test_decrypt_fport_zero_without_nwk_skey_is_reported() {
    let phy = EncryptedDataPayload::new(data_payload_with_fport_zero()).unwrap();
    let app_skey = AppSKey::from([1; 16]);
    assert_eq!(phy.decrypt(None, Some(&app_skey), 0).err(), Some(Error::MissingKey));
}

#[test]
fn test_decrypt_downlink_missing_f_port() {
    let encrypted_payload = EncryptedDataPayload::new([
        0x60, 0x0, 0x0, 0x0, 0x48, 0xa, 0x0, 0x0, 0x3, 0x0, 0x0, 0x0, 0x70, 0x3, 0x0, 0x0, 0xff,
        0x0, 0xfc, 0x68, 0xf4, 0x5e,
    ])
    .unwrap();
    let key = NwkSKey::from([1; 16]);
    let fcnt = 0;
    assert!(encrypted_payload.decrypt(Some(&key), None, fcnt).is_ok());
}

#[test]
fn test_new_frequency() {
    let freq = Frequency::new(&[0x18, 0x4F, 0x84]);

    assert!(freq.is_some());
    assert_eq!(freq.unwrap().value(), 867_100_000);
}

#[test]
fn test_fctrl_uplink_complete() {
    let byte = 0xff;
    let uplink_fctrl = FCtrl::new(byte, true);
    assert!(uplink_fctrl.ack());
    assert!(uplink_fctrl.adr());
    assert!(uplink_fctrl.adr_ack_req());
    assert_eq!(uplink_fctrl.f_opts_len(), 15);
    assert_eq!(uplink_fctrl.raw_value(), byte);
}

#[test]
fn test_fctrl_downlink_complete() {
    let downlink_fctrl = FCtrl::new(0xff, false);
    assert!(downlink_fctrl.f_pending());
}

#[test]
fn test_data_payload_uplink_creator() {
    let mut buf = [0u8; 18];
    let mut phy = DataPayloadCreator::new(&mut buf[..]).unwrap();
    let nwk_skey = NwkSKey::from([2; 16]);
    let app_skey = AppSKey::from([1; 16]);
    let fctrl = FCtrl::new(0x80, true);
    phy.set_confirmed(false)
        .set_uplink(true)
        .set_f_port(1)
        .set_dev_addr(&[4, 3, 2, 1])
        .set_fctrl(&fctrl) // ADR: true, all others: false
        .set_fcnt(1);

    assert_eq!(
        phy.build(b"hello", &[], &nwk_skey, &app_skey, &DefaultFactory).unwrap(),
        &phy_dataup_payload()[..]
    );
}

#[test]
fn test_long_data_payload_uplink_creator() {
    let mut buf = [0u8; 258];
    let mut phy = DataPayloadCreator::new(&mut buf[..]).unwrap();
    let nwk_skey = NwkSKey::from([2; 16]);
    let app_skey = AppSKey::from([1; 16]);
    let fctrl = FCtrl::new(0x00, true);
    phy.set_confirmed(false)
        .set_uplink(true)
        .set_f_port(1)
        .set_dev_addr(&[4, 3, 2, 1])
        .set_fctrl(&fctrl) // all flags set to false
        .set_fcnt(0);

    assert_eq!(
        phy.build(&long_data_payload().into_bytes()[..], &[], &nwk_skey, &app_skey, &DefaultFactory)
            .unwrap(),
        &phy_long_dataup_payload()[..]
    );
}

#[test]
fn test_data_payload_downlink_creator() {
    let mut buf = [0u8; 23];
    let mut phy = DataPayloadCreator::new(&mut buf[..]).unwrap();
    let nwk_skey = NwkSKey::from([2; 16]);
    let app_skey = AppSKey::from([1; 16]);
    let fctrl = FCtrl::new(0x80, false);
    phy.set_confirmed(true)
        .set_uplink(false)
        .set_f_port(42)
        .set_dev_addr(&[4, 3, 2, 1])
        .set_fctrl(&fctrl) // ADR: true, all others: false
        .set_fcnt(76543);

    assert_eq!(
        phy.build(b"hello lora", &[], &nwk_skey, &app_skey, &DefaultFactory).unwrap(),
        &phy_datadown_payload()[..]
    );
}

#[test]
fn test_data_payload_creator_with_fport_zero_uses_nwk_skey() {
    let mut buf = [0u8; 16];
    let mut phy = DataPayloadCreator::new(&mut buf[..]).unwrap();
    let nwk_skey = NwkSKey::from([1; 16]);
    let app_skey = AppSKey::from([1; 16]);
    phy.set_confirmed(false).set_uplink(true).set_f_port(0).set_dev_addr(&[4, 3, 2, 1]).set_fcnt(0);

    assert_eq!(
        phy.build(&[0x02, 0x03, 0x05], &[], &nwk_skey, &app_skey, &DefaultFactory).unwrap(),
        &data_payload_with_fport_zero()[..]
    );
}

#[test]
fn test_data_payload_creator_with_f_opts() {
    let mut buf = [0u8; 15];
    let mut phy = DataPayloadCreator::new(&mut buf[..]).unwrap();
    let nwk_skey = NwkSKey::from([1; 16]);
    let app_skey = AppSKey::from([1; 16]);
    phy.set_confirmed(false).set_uplink(true).set_dev_addr(&[4, 3, 2, 1]).set_fcnt(0);

    assert_eq!(
        phy.build(&[], &[0x02, 0x03, 0x05], &nwk_skey, &app_skey, &DefaultFactory).unwrap(),
        &data_payload_with_f_opts()[..]
    );
}

#[test]
fn test_data_payload_creator_when_payload_no_fport() {
    let mut buf = [0u8; 32];
    let mut phy = DataPayloadCreator::new(&mut buf[..]).unwrap();
    let nwk_skey = NwkSKey::from([2; 16]);
    let app_skey = AppSKey::from([1; 16]);
    assert_eq!(
        phy.build(b"hello", &[], &nwk_skey, &app_skey, &DefaultFactory),
        Err(CreatorError::PayloadWithoutFPort)
    );
}

#[test]
fn test_data_payload_creator_when_f_opts_too_long() {
    let mut buf = [0u8; 64];
    let mut phy = DataPayloadCreator::new(&mut buf[..]).unwrap();
    let nwk_skey = NwkSKey::from([2; 16]);
    let app_skey = AppSKey::from([1; 16]);
    assert_eq!(
        phy.build(&[], &[0u8; 16], &nwk_skey, &app_skey, &DefaultFactory),
        Err(CreatorError::FOptsTooLong)
    );
}

#[test]
fn test_join_request_dev_eui_extraction() {
    let data = phy_join_request_payload();
    let join_request = JoinRequestPayload::new(&data[..]).unwrap();
    assert_eq!(join_request.dev_eui(), EUI64::new(&data[9..17]).unwrap());
}

#[test]
fn test_join_request_app_eui_extraction() {
    let data = phy_join_request_payload();
    let join_request = JoinRequestPayload::new(&data[..]).unwrap();
    assert_eq!(join_request.app_eui(), EUI64::new(&data[1..9]).unwrap());
}

#[test]
fn test_join_request_dev_nonce_extraction() {
    let data = phy_join_request_payload();
    let join_request = JoinRequestPayload::new(&data[..]).unwrap();
    assert_eq!(join_request.dev_nonce(), DevNonce::new(&data[17..19]).unwrap());
}

#[test]
fn test_validate_join_request_mic_when_ok() {
    let data = phy_join_request_payload();
    let join_request = JoinRequestPayload::new(&data[..]).unwrap();
    let key = AppKey::from([1; 16]);
    assert!(join_request.validate_mic(&key));
}

#[test]
fn test_validate_join_request_mic_when_not_ok() {
    let data = phy_join_request_payload();
    let join_request = JoinRequestPayload::new(&data[..]).unwrap();
    let key = AppKey::from([2; 16]);
    assert!(!join_request.validate_mic(&key));
}

#[test]
fn test_join_request_creator() {
    let mut buf = [0u8; 23];
    let mut phy = JoinRequestCreator::new(&mut buf[..]).unwrap();
    let key = AppKey::from([1; 16]);
    phy.set_app_eui(&[0x04, 0x03, 0x02, 0x01, 0x04, 0x03, 0x02, 0x01])
        .set_dev_eui(&[0x05, 0x04, 0x03, 0x02, 0x05, 0x04, 0x03, 0x02])
        .set_dev_nonce(&[0x2du8, 0x10]);

    assert_eq!(phy.build(&key, &DefaultFactory), &phy_join_request_payload()[..]);
}

#[test]
fn test_join_accept_creator_roundtrip() {
    let mut buf = [0u8; 17];
    let key = AppKey::from(app_key());
    {
        let mut phy = JoinAcceptCreator::new(&mut buf[..]).unwrap();
        phy.set_app_nonce(&[0xc7, 0x0b, 0x57])
            .set_net_id(&[0x01, 0x11, 0x22])
            .set_dev_addr(&[0x80, 0x19, 0x03, 0x02])
            .set_dl_settings(0x12)
            .set_rx_delay(3);
        phy.build(&key, &DefaultFactory).unwrap();
    }

    let decrypted = DecryptedJoinAcceptPayload::new(&mut buf[..], &key).unwrap();
    assert!(decrypted.validate_mic(&key));
    assert_eq!(decrypted.app_nonce(), AppNonce::new(&[0xc7, 0x0b, 0x57][..]).unwrap());
    assert_eq!(decrypted.net_id(), NwkAddr::new(&[0x01, 0x11, 0x22][..]).unwrap());
    assert_eq!(decrypted.dev_addr(), DevAddr::new(&[0x80, 0x19, 0x03, 0x02][..]).unwrap());
    assert_eq!(decrypted.dl_settings().raw_value(), 0x12);
    assert_eq!(decrypted.rx_delay(), 3);
    assert_eq!(decrypted.c_f_list(), None);
}

#[test]
fn test_join_accept_creator_roundtrip_with_c_f_list() {
    let mut buf = [0u8; 33];
    let key = AppKey::from([1; 16]);
    let freqs = [
        Frequency::new(&[0x18, 0x4F, 0x84]).unwrap(),
        Frequency::new(&[0xE8, 0x56, 0x84]).unwrap(),
        Frequency::new(&[0xB8, 0x5E, 0x84]).unwrap(),
        Frequency::new(&[0x88, 0x66, 0x84]).unwrap(),
        Frequency::new(&[0x58, 0x6E, 0x84]).unwrap(),
    ];
    {
        let mut phy = JoinAcceptCreator::new(&mut buf[..]).unwrap();
        phy.set_app_nonce(&[3, 2, 1]).set_net_id(&[0x29, 0x18, 0x07]).set_dev_addr(&[1; 4]);
        phy.set_c_f_list(&freqs[..]).unwrap();
        phy.build(&key, &DefaultFactory).unwrap();
    }

    let decrypted = DecryptedJoinAcceptPayload::new(&mut buf[..], &key).unwrap();
    assert!(decrypted.validate_mic(&key));
    match decrypted.c_f_list() {
        Some(CfList::DynamicChannel(parsed)) => {
            for (parsed, expected) in parsed.iter().zip(freqs.iter()) {
                assert_eq!(parsed.value(), expected.value());
            }
        }
        other => panic!("expected a dynamic channel list, got {other:?}"),
    }
}

#[test]
fn test_join_accept_tampered_mic_is_rejected() {
    let mut buf = [0u8; 17];
    let key = AppKey::from(app_key());
    {
        let mut phy = JoinAcceptCreator::new(&mut buf[..]).unwrap();
        phy.set_app_nonce(&[1, 2, 3]).set_net_id(&[4, 5, 6]).set_dev_addr(&[7; 4]);
        phy.build(&key, &DefaultFactory).unwrap();
    }
    // flip one ciphertext bit; the decrypted MIC can no longer match
    buf[5] ^= 0x40;
    assert_eq!(
        DecryptedJoinAcceptPayload::new(&mut buf[..], &key).err(),
        Some(Error::Malformed("MIC"))
    );
}

#[test]
fn test_derive_nwkskey() {
    let key = AppKey::from(app_key());
    let join_request = JoinRequestPayload::new(phy_join_request_payload()).unwrap();
    let join_accept = EncryptedJoinAcceptPayload::new(phy_join_accept_payload()).unwrap().decrypt(&key);

    let nwkskey = join_accept.derive_nwkskey(&join_request.dev_nonce(), &key);
    //AppNonce([49, 3e, eb]), NwkAddr([51, fb, a2]), DevNonce([2d, 10])
    let expect = [
        0x7b, 0xb2, 0x5f, 0x89, 0xe0, 0xd1, 0x37, 0x1e, 0x1f, 0xbf, 0x4d, 0x99, 0x7e, 0x14, 0x68,
        0xa3,
    ];
    assert_eq!(nwkskey, NwkSKey::from(expect));
}

#[test]
fn test_derive_appskey() {
    let key = AppKey::from(app_key());
    let join_request = JoinRequestPayload::new(phy_join_request_payload()).unwrap();
    let join_accept = EncryptedJoinAcceptPayload::new(phy_join_accept_payload()).unwrap().decrypt(&key);

    let appskey = join_accept.derive_appskey(&join_request.dev_nonce(), &key);
    //AppNonce([49, 3e, eb]), NwkAddr([51, fb, a2]), DevNonce([2d, 10])
    let expect = [
        0x14, 0x88, 0x20, 0xdf, 0xb1, 0xe0, 0xc9, 0xd6, 0x28, 0x9c, 0xde, 0x16, 0xc1, 0xaf, 0x24,
        0x9f,
    ];

    assert_eq!(appskey, AppSKey::from(expect));
}

fn build_data_frame(
    dev_addr: [u8; 4],
    fcnt: u32,
    uplink: bool,
    confirmed: bool,
    payload: &[u8],
) -> Vec<u8> {
    let mut buf = [0u8; 64];
    let nwk_skey = NwkSKey::from([2; 16]);
    let app_skey = AppSKey::from([1; 16]);
    let mut phy = DataPayloadCreator::new(&mut buf[..]).unwrap();
    phy.set_confirmed(confirmed)
        .set_uplink(uplink)
        .set_f_port(1)
        .set_dev_addr(&dev_addr)
        .set_fcnt(fcnt);
    phy.build(payload, &[], &nwk_skey, &app_skey, &DefaultFactory).unwrap().to_vec()
}

fn mic_of(frame: &[u8]) -> &[u8] {
    &frame[frame.len() - 4..]
}

#[test]
fn test_mic_changes_with_every_header_field() {
    let base = build_data_frame([4, 3, 2, 1], 1, true, false, b"hello");

    // single-bit changes in dev_addr, fcnt, direction and MHDR
    let addr_flip = build_data_frame([5, 3, 2, 1], 1, true, false, b"hello");
    let fcnt_flip = build_data_frame([4, 3, 2, 1], 3, true, false, b"hello");
    let dir_flip = build_data_frame([4, 3, 2, 1], 1, false, false, b"hello");
    let mhdr_flip = build_data_frame([4, 3, 2, 1], 1, true, true, b"hello");
    let payload_flip = build_data_frame([4, 3, 2, 1], 1, true, false, b"hellp");

    assert_ne!(mic_of(&base), mic_of(&addr_flip));
    assert_ne!(mic_of(&base), mic_of(&fcnt_flip));
    assert_ne!(mic_of(&base), mic_of(&dir_flip));
    assert_ne!(mic_of(&base), mic_of(&mhdr_flip));
    assert_ne!(mic_of(&base), mic_of(&payload_flip));
}

#[test]
fn test_payload_cipher_involution_around_block_boundaries() {
    let nwk_skey = NwkSKey::from([2; 16]);
    let app_skey = AppSKey::from([1; 16]);
    for len in [0usize, 1, 15, 16, 17, 32] {
        let payload: Vec<u8> = (0..len as u8).collect();
        let mut buf = [0u8; 64];
        let mut phy = DataPayloadCreator::new(&mut buf[..]).unwrap();
        phy.set_uplink(true).set_f_port(1).set_dev_addr(&[4, 3, 2, 1]).set_fcnt(42);
        let frame =
            phy.build(&payload, &[], &nwk_skey, &app_skey, &DefaultFactory).unwrap().to_vec();

        let parsed = EncryptedDataPayload::new(frame).unwrap();
        assert!(parsed.validate_mic(&nwk_skey, 42), "bad MIC for payload length {len}");
        let decrypted = parsed.decrypt(Some(&nwk_skey), Some(&app_skey), 42).unwrap();
        assert_eq!(decrypted.frm_payload(), FRMPayload::Data(&payload[..]), "length {len}");
    }
}

#[test]
fn test_uplink_roundtrip_under_zero_keys() {
    let nwk_skey = NwkSKey::from([0; 16]);
    let app_skey = AppSKey::from([0; 16]);

    let build = || {
        let mut buf = [0u8; 32];
        let mut phy = DataPayloadCreator::new(&mut buf[..]).unwrap();
        phy.set_uplink(true).set_f_port(1).set_dev_addr(&[0x01, 0x02, 0x03, 0x04]).set_fcnt(5);
        phy.build(b"hi", &[], &nwk_skey, &app_skey, &DefaultFactory).unwrap().to_vec()
    };

    let frame = build();
    // the same inputs always produce the same frame and MIC
    assert_eq!(frame, build());

    let parsed = EncryptedDataPayload::new(frame).unwrap();
    assert!(parsed.validate_mic(&nwk_skey, 5));
    let decrypted = parsed.decrypt(None, Some(&app_skey), 5).unwrap();
    assert_eq!(decrypted.frm_payload(), FRMPayload::Data(&b"hi"[..]));
}
