//! [Dictionary](https://learn.microsoft.com/en-us/openspecs/exchange_server_protocols/ms-oxrtfcp/4238b0e2-7147-42da-88c9-ea45a1243e67)

const DICTIONARY_SIZE: usize = 4096;

/// The preloaded prefix of common RTF control words.
const INITIAL_DICTIONARY: &[u8] = b"{\\rtf1\\ansi\\mac\\deff0\\deftab720{\\fonttbl;}{\\f0\\fnil \\froman \\fswiss \\fmodern \\fscript \\fdecor MS Sans SerifSymbolArialTimes New RomanCourier{\\colortbl\\red0\\green0\\blue0\r\n\\par \\pard\\plain\\f0\\fs20\\b\\i\\u\\tab\\tx";

/// The 4096-byte sliding window. Decoding appends every produced byte, so
/// a reference may legally read bytes it is writing in the same run.
pub struct Dictionary {
    buffer: [u8; DICTIONARY_SIZE],
    write_offset: usize,
}

impl Default for Dictionary {
    fn default() -> Self {
        let mut buffer = [0; DICTIONARY_SIZE];
        buffer[..INITIAL_DICTIONARY.len()].copy_from_slice(INITIAL_DICTIONARY);
        Self {
            buffer,
            write_offset: INITIAL_DICTIONARY.len(),
        }
    }
}

impl Dictionary {
    pub fn push(&mut self, byte: u8) {
        self.buffer[self.write_offset] = byte;
        self.write_offset = (self.write_offset + 1) % DICTIONARY_SIZE;
    }

    /// Expands one reference, echoing each produced byte back into the
    /// window. `None` marks the end of the token stream: a reference whose
    /// offset equals the current write position.
    pub fn run(&mut self, reference: Reference) -> Option<Vec<u8>> {
        let offset = reference.offset() as usize;
        if offset == self.write_offset {
            return None;
        }

        let length = reference.length() as usize;
        let mut output = Vec::with_capacity(length);
        let mut read_offset = offset;
        for _ in 0..length {
            let byte = self.buffer[read_offset];
            read_offset = (read_offset + 1) % DICTIONARY_SIZE;
            output.push(byte);
            self.push(byte);
        }
        Some(output)
    }
}

/// [Dictionary Reference](https://learn.microsoft.com/en-us/openspecs/exchange_server_protocols/ms-oxrtfcp/b12474df-e0ef-4731-9315-454a49a984d8)
///
/// A big-endian 16-bit token: 12 bits of window offset, 4 bits of length
/// biased by 2.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Reference(pub u16);

impl Reference {
    pub fn offset(self) -> u16 {
        self.0 >> 4
    }

    pub fn length(self) -> u8 {
        (self.0 & 0x0F) as u8 + 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_bit_layout() {
        let reference = Reference(0x1234);
        assert_eq!(reference.offset(), 0x123);
        assert_eq!(reference.length(), 6);
    }

    #[test]
    fn test_initial_window_ends_at_preload() {
        let mut dictionary = Dictionary::default();
        let end = Reference((INITIAL_DICTIONARY.len() as u16) << 4);
        assert_eq!(dictionary.run(end), None);
    }

    #[test]
    fn test_run_echoes_into_window() {
        let mut dictionary = Dictionary::default();
        // "{\rtf1" from the preloaded prefix.
        let run = dictionary.run(Reference(0x0004)).unwrap();
        assert_eq!(run, b"{\\rtf1");
        // The echo advanced the write position past the preload.
        let end = Reference(((INITIAL_DICTIONARY.len() + 6) as u16) << 4);
        assert_eq!(dictionary.run(end), None);
    }

    #[test]
    fn test_run_may_cross_write_position() {
        let mut dictionary = Dictionary::default();
        for &byte in b"ab" {
            dictionary.push(byte);
        }
        let start = (INITIAL_DICTIONARY.len()) as u16;
        // Length 6 starting at "ab" reads bytes produced by itself.
        let run = dictionary.run(Reference((start << 4) | 0x04)).unwrap();
        assert_eq!(run, b"ababab");
    }
}
