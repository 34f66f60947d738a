//! Signature threshold check over an attestation digest.

use std::collections::BTreeSet;

use alloy_primitives::{Address, Signature, B256};

use crate::{client_state::ClientState, error::IbcAttestorClientError};

/// Verifies that enough distinct trusted attestors signed `digest`.
///
/// Returns the number of distinct trusted signers.
///
/// Signers outside the attestor set are ignored and a signer appearing
/// more than once counts once.
///
/// # Errors
/// - A signature cannot be parsed or recovered ([`IbcAttestorClientError::InvalidSignature`])
/// - Fewer than `min_required_sigs` distinct trusted signers
///   ([`IbcAttestorClientError::InsufficientSignatures`])
#[allow(clippy::module_name_repetitions)]
pub fn verify_attestation(
    client_state: &ClientState,
    digest: &[u8; 32],
    signatures: &[Vec<u8>],
) -> Result<u32, IbcAttestorClientError> {
    let prehash = B256::from(*digest);

    let mut signers: BTreeSet<Address> = BTreeSet::new();
    for (index, raw) in signatures.iter().enumerate() {
        let address = recover_address(&prehash, raw)
            .ok_or(IbcAttestorClientError::InvalidSignature { index })?;
        if client_state.is_attestor(&address) {
            signers.insert(address);
        }
    }

    let found = u32::try_from(signers.len()).unwrap_or(u32::MAX);
    if found < client_state.min_required_sigs {
        return Err(IbcAttestorClientError::InsufficientSignatures {
            required: client_state.min_required_sigs,
            found,
        });
    }

    Ok(found)
}

fn recover_address(prehash: &B256, signature_65: &[u8]) -> Option<Address> {
    let sig = Signature::try_from(signature_65).ok()?;
    sig.recover_address_from_prehash(prehash).ok()
}

#[cfg(test)]
mod tests {
    use ibc_eureka_types::Height;
    use rstest::rstest;

    use super::*;
    use crate::test_utils::{addresses, sign_digest, signers};

    const DIGEST: [u8; 32] = [0x42; 32];

    fn client_state(n: usize, min_required_sigs: u32) -> ClientState {
        ClientState::new(addresses()[..n].to_vec(), min_required_sigs, Height::at(100)).unwrap()
    }

    fn sigs(indices: &[usize]) -> Vec<Vec<u8>> {
        let signers = signers();
        indices.iter().map(|&i| sign_digest(&signers[i], &DIGEST)).collect()
    }

    #[rstest]
    #[case::exact_quorum(3, 2, &[0, 1], 2)]
    #[case::above_quorum(3, 2, &[0, 1, 2], 3)]
    #[case::unknown_signer_ignored(2, 2, &[0, 4, 1], 2)]
    #[case::duplicate_beyond_quorum(2, 1, &[0, 0], 1)]
    fn succeeds(
        #[case] n: usize,
        #[case] min: u32,
        #[case] signer_indices: &[usize],
        #[case] expected: u32,
    ) {
        let found =
            verify_attestation(&client_state(n, min), &DIGEST, &sigs(signer_indices)).unwrap();
        assert_eq!(found, expected);
    }

    #[rstest]
    #[case::no_signatures(3, 1, &[], 0)]
    #[case::one_short(3, 2, &[0], 1)]
    #[case::duplicates_count_once(3, 2, &[0, 0], 1)]
    #[case::only_unknown(2, 1, &[3, 4], 0)]
    fn fails_below_quorum(
        #[case] n: usize,
        #[case] min: u32,
        #[case] signer_indices: &[usize],
        #[case] expected_found: u32,
    ) {
        let res = verify_attestation(&client_state(n, min), &DIGEST, &sigs(signer_indices));
        assert!(matches!(
            res,
            Err(IbcAttestorClientError::InsufficientSignatures { required, found })
                if required == min && found == expected_found
        ));
    }

    #[test]
    fn signature_over_other_digest_does_not_count() {
        let signer = &signers()[0];
        let other = sign_digest(signer, &[0x43; 32]);
        let res = verify_attestation(&client_state(2, 1), &DIGEST, &[other]);
        assert!(matches!(
            res,
            Err(IbcAttestorClientError::InsufficientSignatures { found: 0, .. })
        ));
    }

    #[rstest]
    #[case::too_short(vec![0u8; 64])]
    #[case::empty(vec![])]
    fn fails_on_malformed_signature(#[case] malformed: Vec<u8>) {
        let mut signatures = sigs(&[0]);
        signatures.push(malformed);
        let res = verify_attestation(&client_state(2, 1), &DIGEST, &signatures);
        assert!(matches!(
            res,
            Err(IbcAttestorClientError::InvalidSignature { index: 1 })
        ));
    }
}
