//! Generation-sized symbol storage.
//!
//! Holds `symbols × symbol_size` bytes and tracks which symbol ids have been
//! populated. Complete mode fills everything at once via [`SymbolStorage::set_symbols`];
//! incremental mode fills one id at a time via [`SymbolStorage::set_symbol`].

use crate::error::{CodingError, Result};

pub struct SymbolStorage {
    symbols: usize,
    symbol_size: usize,
    data: Vec<u8>,
    populated: Vec<bool>,
    populated_count: usize,
}

impl SymbolStorage {
    pub fn new(symbols: usize, symbol_size: usize) -> Self {
        Self {
            symbols,
            symbol_size,
            data: vec![0u8; symbols * symbol_size],
            populated: vec![false; symbols],
            populated_count: 0,
        }
    }

    pub fn symbols(&self) -> usize {
        self.symbols
    }

    pub fn symbol_size(&self) -> usize {
        self.symbol_size
    }

    pub fn block_size(&self) -> usize {
        self.symbols * self.symbol_size
    }

    /// Populate every symbol from one buffer. A buffer shorter than the block
    /// leaves the tail zero-filled.
    pub fn set_symbols(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > self.block_size() {
            return Err(CodingError::InvalidParameters(format!(
                "block of {} bytes exceeds generation size of {} bytes",
                data.len(),
                self.block_size()
            )));
        }
        self.data[..data.len()].copy_from_slice(data);
        self.data[data.len()..].fill(0);
        self.populated.fill(true);
        self.populated_count = self.symbols;
        Ok(())
    }

    /// Populate a single symbol. Shorter input is zero-padded.
    pub fn set_symbol(&mut self, index: usize, data: &[u8]) -> Result<()> {
        if index >= self.symbols {
            return Err(CodingError::InvalidParameters(format!(
                "symbol index {} out of range for {} symbols",
                index, self.symbols
            )));
        }
        if data.len() > self.symbol_size {
            return Err(CodingError::InvalidParameters(format!(
                "symbol of {} bytes exceeds symbol size {}",
                data.len(),
                self.symbol_size
            )));
        }
        let start = index * self.symbol_size;
        let dst = &mut self.data[start..start + self.symbol_size];
        dst[..data.len()].copy_from_slice(data);
        dst[data.len()..].fill(0);
        if !self.populated[index] {
            self.populated[index] = true;
            self.populated_count += 1;
        }
        Ok(())
    }

    pub fn is_populated(&self, index: usize) -> bool {
        self.populated.get(index).copied().unwrap_or(false)
    }

    pub fn populated_count(&self) -> usize {
        self.populated_count
    }

    pub fn is_complete(&self) -> bool {
        self.populated_count == self.symbols
    }

    /// Lowest symbol id not yet populated.
    pub fn first_missing(&self) -> Option<usize> {
        self.populated.iter().position(|&p| !p)
    }

    pub fn populated_ids(&self) -> impl Iterator<Item = usize> + Clone + '_ {
        self.populated
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| p.then_some(i))
    }

    /// Data of a populated symbol.
    pub fn symbol(&self, index: usize) -> Result<&[u8]> {
        if !self.is_populated(index) {
            return Err(CodingError::UninitializedSymbol { index });
        }
        let start = index * self.symbol_size;
        Ok(&self.data[start..start + self.symbol_size])
    }

    /// The whole block, unpopulated symbols zero-filled.
    pub fn block(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_symbols_complete() {
        let mut s = SymbolStorage::new(3, 2);
        s.set_symbols(&[1, 2, 3, 4, 5, 6]).unwrap();
        assert!(s.is_complete());
        assert_eq!(s.symbol(1).unwrap(), &[3, 4]);
        assert_eq!(s.first_missing(), None);
    }

    #[test]
    fn test_set_symbols_short_is_zero_padded() {
        let mut s = SymbolStorage::new(3, 2);
        s.set_symbols(&[9, 9, 9]).unwrap();
        assert_eq!(s.block(), &[9, 9, 9, 0, 0, 0]);
        assert!(s.is_complete());
    }

    #[test]
    fn test_set_symbols_too_long() {
        let mut s = SymbolStorage::new(2, 2);
        let err = s.set_symbols(&[0; 5]).unwrap_err();
        assert!(matches!(err, CodingError::InvalidParameters(_)));
    }

    #[test]
    fn test_incremental_population() {
        let mut s = SymbolStorage::new(4, 3);
        assert_eq!(s.populated_count(), 0);
        assert_eq!(
            s.symbol(0).unwrap_err(),
            CodingError::UninitializedSymbol { index: 0 }
        );

        s.set_symbol(2, &[7, 8]).unwrap();
        assert_eq!(s.populated_count(), 1);
        assert_eq!(s.symbol(2).unwrap(), &[7, 8, 0]);
        assert_eq!(s.first_missing(), Some(0));

        // Re-setting the same id does not double count.
        s.set_symbol(2, &[1, 1, 1]).unwrap();
        assert_eq!(s.populated_count(), 1);
        assert_eq!(s.populated_ids().collect::<Vec<_>>(), vec![2]);
        assert!(!s.is_complete());
    }

    #[test]
    fn test_set_symbol_out_of_range() {
        let mut s = SymbolStorage::new(2, 2);
        assert!(s.set_symbol(2, &[1]).is_err());
        assert!(s.set_symbol(0, &[1, 2, 3]).is_err());
        assert!(!s.is_populated(5));
    }
}
