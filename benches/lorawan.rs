use criterion::{criterion_group, criterion_main, Criterion};

use lorawan_packet::keys::*;
use lorawan_packet::parser::*;

fn bench_complete_data_payload_fhdr(c: &mut Criterion) {
    c.bench_function("data_payload_headers_parsing", |b| {
        b.iter(|| {
            let mut data = data_payload();
            let phy = parse(&mut data[..]).unwrap();

            if let PhyPayload::Data(DataPayload::Encrypted(data_payload)) = phy {
                let mhdr = data_payload.mhdr();
                assert_eq!(mhdr.mtype(), MType::UnconfirmedDataUp);
                assert_eq!(mhdr.major(), Major::LoRaWANR1);
                if data_payload.mic().0[0] < 1 {
                    panic!("no way");
                }

                let fhdr = data_payload.fhdr();

                if fhdr.dev_addr().as_ref()[0] < 1 {
                    panic!("no way");
                }
                assert_eq!(fhdr.fcnt(), 1u16);
                assert!(fhdr.fopts().is_empty());

                let fctrl = fhdr.fctrl();

                assert_eq!(fctrl.f_opts_len(), 0);

                assert!(!fctrl.f_pending(), "no f_pending");

                assert!(!fctrl.ack(), "no ack");

                assert!(fctrl.adr(), "ADR");
            } else {
                panic!("failed to parse DataPayload");
            }
        })
    });
}

fn bench_complete_data_payload_mic_validation(c: &mut Criterion) {
    let mic_key = NwkSKey::from([2; 16]);
    c.bench_function("data_payload_mic_validation", |b| {
        b.iter(|| {
            let mut data = data_payload();
            let phy = parse(&mut data[..]).unwrap();

            if let PhyPayload::Data(DataPayload::Encrypted(data_payload)) = phy {
                assert!(data_payload.validate_mic(&mic_key, 1));
            } else {
                panic!("failed to parse DataPayload");
            }
        })
    });
}

fn bench_complete_data_payload_decrypt(c: &mut Criterion) {
    let key = AppSKey::from([1; 16]);
    c.bench_function("data_payload_decrypt", |b| {
        b.iter(|| {
            let mut data = data_payload();
            let phy = parse(&mut data[..]).unwrap();

            if let PhyPayload::Data(DataPayload::Encrypted(data_payload)) = phy {
                assert_eq!(
                    data_payload.decrypt(None, Some(&key), 1).unwrap().frm_payload(),
                    FRMPayload::Data(&b"hello"[..])
                );
            }
        })
    });
}

criterion_group!(
    benches,
    bench_complete_data_payload_fhdr,
    bench_complete_data_payload_mic_validation,
    bench_complete_data_payload_decrypt
);
criterion_main!(benches);

fn data_payload() -> Vec<u8> {
    vec![
        0x40, 0x04, 0x03, 0x02, 0x01, 0x80, 0x01, 0x00, 0x01, 0xa6, 0x94, 0x64, 0x26, 0x15, 0xd6,
        0xc3, 0xb5, 0x82,
    ]
}
