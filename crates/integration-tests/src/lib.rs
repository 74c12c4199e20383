//! End-to-end integration tests for the sealed-bid auction system.
//!
//! These tests exercise the full auction lifecycle with real cryptography:
//! 1. Network key and KMS committee setup
//! 2. Auction creation
//! 3. Bid encryption (client SDK) and ingestion (coprocessor)
//! 4. Threshold reveal by the decryption authority
//! 5. Conclusion against the KMS signature verifier
