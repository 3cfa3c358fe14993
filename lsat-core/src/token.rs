//! Minting and verifying LSAT macaroons.
//!
//! Signing and signature-chain checks are delegated to the [`macaroon`] crate.
//! This module binds it to LSAT: the root key comes from
//! [`derive_root_key`](crate::root_key::derive_root_key), the identifier is a
//! [`MacaroonIdentifier`], and proof of payment is checked against the
//! identifier's payment hash.

use std::sync::OnceLock;

use base64::{
    Engine,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig, general_purpose::STANDARD},
};
use macaroon::{ByteString, Caveat as MacaroonCaveat, Format, Macaroon, MacaroonKey, Verifier};

use crate::{
    caveat::{Satisfiers, attach},
    errors::{Error, Result},
    root_key::{RootKey, ServerSecret, derive_root_key},
    types::{Caveat, MacaroonIdentifier, Preimage, RequestContext, verify_preimage},
};

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);
const URL_SAFE_PADDED: GeneralPurpose =
    GeneralPurpose::new(&alphabet::URL_SAFE, GeneralPurposeConfig::new());

fn ensure_initialized() -> Result<()> {
    static INITIALIZED: OnceLock<bool> = OnceLock::new();
    if *INITIALIZED.get_or_init(|| macaroon::initialize().is_ok()) {
        Ok(())
    } else {
        Err(Error::MintFailed(
            "failed to initialize macaroon crypto".into(),
        ))
    }
}

fn macaroon_key(root_key: &RootKey) -> MacaroonKey {
    MacaroonKey::generate(root_key.as_bytes())
}

/// Create a macaroon for `identifier`, signed with the key derived from its
/// payment hash, and append `caveats` to it.
pub fn mint_macaroon(
    secret: &ServerSecret,
    identifier: &MacaroonIdentifier,
    caveats: &[Caveat],
    location: Option<String>,
) -> Result<Macaroon> {
    ensure_initialized()?;

    let root_key = derive_root_key(secret, &identifier.payment_hash)?;
    let mut macaroon = Macaroon::create(
        location,
        &macaroon_key(&root_key),
        ByteString(identifier.encode()),
    )
    .map_err(|err| Error::MintFailed(format!("{err:?}")))?;

    attach(&mut macaroon, caveats);
    Ok(macaroon)
}

/// Standard base64 of the V2 binary serialization.
pub fn encode_macaroon(macaroon: &Macaroon) -> Result<String> {
    let url_safe = macaroon
        .serialize(Format::V2)
        .map_err(|err| Error::MintFailed(format!("{err:?}")))?;
    let binary = URL_SAFE_LENIENT
        .decode(url_safe.as_bytes())
        .map_err(|err| Error::MintFailed(err.to_string()))?;
    Ok(STANDARD.encode(binary))
}

/// Parse a base64 encoded macaroon, in either the standard or URL-safe alphabet.
pub fn decode_macaroon(encoded: &str) -> Result<Macaroon> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Err(Error::InvalidMacaroonEncoding("empty macaroon".into()));
    }

    let binary = STANDARD_LENIENT
        .decode(encoded)
        .or_else(|_| URL_SAFE_LENIENT.decode(encoded))
        .map_err(|err| Error::InvalidMacaroonEncoding(err.to_string()))?;
    if binary.is_empty() {
        return Err(Error::InvalidMacaroonEncoding("empty macaroon".into()));
    }

    ensure_initialized().map_err(|err| Error::InvalidMacaroonEncoding(err.to_string()))?;
    Macaroon::deserialize(URL_SAFE_PADDED.encode(binary))
        .map_err(|err| Error::InvalidMacaroonEncoding(format!("{err:?}")))
}

/// Decode the LSAT identifier carried by a macaroon.
pub fn macaroon_identifier(macaroon: &Macaroon) -> Result<MacaroonIdentifier> {
    let raw = macaroon.identifier();
    MacaroonIdentifier::decode(&raw.0)
}

/// First-party caveats of a macaroon, in chain order.
pub fn macaroon_caveats(macaroon: &Macaroon) -> Result<Vec<Caveat>> {
    macaroon
        .first_party_caveats()
        .iter()
        .filter_map(|caveat| match caveat {
            MacaroonCaveat::FirstParty(first_party) => Some(first_party.predicate()),
            _ => None,
        })
        .map(|predicate| {
            let raw = std::str::from_utf8(&predicate.0).map_err(|_| {
                Error::caveat_mismatch(hex::encode(&predicate.0), "caveat is not valid UTF-8")
            })?;
            raw.parse()
                .map_err(|_| Error::caveat_mismatch(raw, "caveat is not in condition=value form"))
        })
        .collect()
}

fn accept_any_predicate(_: &ByteString) -> bool {
    true
}

/// Verify a macaroon and the preimage presented with it.
///
/// Gates, in order:
///
/// 1. decode the identifier,
/// 2. derive the root key from the identifier's payment hash,
/// 3. check the signature chain,
/// 4. check the macaroon's caveats and every `expected` caveat against the request,
/// 5. check the preimage against the payment hash.
///
/// Every `expected` caveat must also be carried by the macaroon, so a token
/// minted without caveats is rejected wherever caveats are expected.
pub fn verify_macaroon(
    macaroon: &Macaroon,
    expected: &[Caveat],
    secret: &ServerSecret,
    preimage: &Preimage,
    satisfiers: &Satisfiers,
    context: &RequestContext,
) -> Result<MacaroonIdentifier> {
    let identifier = macaroon_identifier(macaroon)
        .map_err(|err| Error::InvalidMacaroonEncoding(err.to_string()))?;

    let root_key = derive_root_key(secret, &identifier.payment_hash)?;

    ensure_initialized().map_err(|err| Error::SignatureInvalid(err.to_string()))?;
    // Caveat predicates are checked below against the request; here only the chain.
    let mut verifier = Verifier::default();
    verifier.satisfy_general(accept_any_predicate);
    verifier
        .verify(macaroon, &macaroon_key(&root_key), Vec::new())
        .map_err(|err| Error::SignatureInvalid(format!("{err:?}")))?;

    let carried = macaroon_caveats(macaroon)?;
    satisfiers.satisfy(&carried, context)?;
    for caveat in expected {
        if !carried.contains(caveat) {
            return Err(Error::caveat_mismatch(caveat, "caveat missing from macaroon"));
        }
        satisfiers.satisfy_one(caveat, context)?;
    }

    verify_preimage(preimage.as_bytes(), &identifier.payment_hash)?;

    Ok(identifier)
}
