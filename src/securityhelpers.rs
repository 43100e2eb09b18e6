//! Block constructions shared by the MIC and payload-cipher paths.

use crate::keys::{Encrypter, Mac, MIC};
use crate::parser::Direction;

/// The inputs every data-frame crypto block derives from.
///
/// The direction byte, device address and 32-bit frame counter fill bytes
/// 5..14 of both the B0 MIC block and the Ai keystream blocks. Callers
/// extract them from the frame header once and pass them explicitly.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockContext {
    direction: Direction,
    dev_addr: [u8; 4],
    fcnt: u32,
}

impl BlockContext {
    /// `dev_addr` is in wire order, `fcnt` is the full 32-bit counter.
    pub(crate) fn new(direction: Direction, dev_addr: [u8; 4], fcnt: u32) -> Self {
        Self { direction, dev_addr, fcnt }
    }

    /// Fills a 16-byte block. Byte 0 tags the use (0x49 for the MIC, 0x01
    /// for the keystream); byte 15 is left zero for the caller.
    fn block(&self, first: u8) -> [u8; 16] {
        let mut block = [0u8; 16];
        block[0] = first;
        block[5] = self.direction.value();
        block[6..10].copy_from_slice(&self.dev_addr);
        block[10..14].copy_from_slice(&self.fcnt.to_le_bytes());
        block
    }
}

/// Computes the MIC of a data frame: CMAC over B0 and the frame bytes,
/// truncated to 4 bytes.
pub(crate) fn calculate_data_mic<M: Mac>(data: &[u8], mac: M, ctx: &BlockContext) -> MIC {
    let mut b0 = ctx.block(0x49);
    b0[15] = data.len() as u8;
    calculate_mic_with_header(&b0, data, mac)
}

/// Computes the MIC of a JoinRequest frame: plain CMAC over the frame
/// bytes, no B0 block.
pub(crate) fn calculate_mic<M: Mac>(data: &[u8], mac: M) -> MIC {
    calculate_mic_with_header(&[], data, mac)
}

/// Computes the MIC of a JoinAccept: CMAC over the clear fields with the
/// MHDR appended after them.
pub(crate) fn calculate_join_accept_mic<M: Mac>(clear_fields: &[u8], mhdr: u8, mac: M) -> MIC {
    calculate_mic_with_header(clear_fields, &[mhdr], mac)
}

fn calculate_mic_with_header<M: Mac>(header: &[u8], data: &[u8], mut mac: M) -> MIC {
    mac.input(header);
    mac.input(data);
    let result = mac.result();

    let mut mic = [0u8; 4];
    mic.copy_from_slice(&result[0..4]);

    MIC(mic)
}

/// XORs the AES keystream over `phy_payload[start..end]`.
///
/// Encryption and decryption are the same operation. The Ai block counter
/// is 1-based; the final keystream block is truncated to the payload length.
pub(crate) fn encrypt_frm_data_payload(
    phy_payload: &mut [u8],
    start: usize,
    end: usize,
    ctx: &BlockContext,
    aes_enc: &dyn Encrypter,
) {
    let len = end - start;

    let mut a = ctx.block(0x01);
    let mut s = [0u8; 16];

    let mut ctr = 1;
    for i in 0..len {
        let j = i & 0x0f;
        if j == 0 {
            a[15] = ctr;
            ctr += 1;
            s.copy_from_slice(&a);
            aes_enc.encrypt_block(&mut s);
        }
        phy_payload[start + i] ^= s[j];
    }
}
