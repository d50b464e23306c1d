use lectern_core::{
    ConflictError, CoreError, Credentials, EntityKind, ProfileStore, UserProfile,
};

/// Load the caller's profile and check the presented password against it.
///
/// A missing profile is `NotFound(User)`; a wrong password is `InvalidCredentials`.
pub(crate) fn authenticate<P: ProfileStore>(
    profiles: &P,
    credentials: &Credentials,
) -> Result<UserProfile, CoreError> {
    let key = lectern_core::profile_key(&credentials.email);
    let profile = profiles
        .get(&key)?
        .ok_or_else(|| CoreError::not_found(EntityKind::User, &credentials.email))?;

    if !credentials.verify(&profile) {
        return Err(CoreError::InvalidCredentials);
    }
    Ok(profile)
}

/// Like `authenticate`, but a missing profile is reported as bad credentials.
pub(crate) fn authenticate_strict<P: ProfileStore>(
    profiles: &P,
    credentials: &Credentials,
) -> Result<UserProfile, CoreError> {
    match authenticate(profiles, credentials) {
        Err(CoreError::NotFound(EntityKind::User, _)) => Err(CoreError::InvalidCredentials),
        other => other,
    }
}

/// Write the whole profile back, conditional on the version it was read at.
pub(crate) fn write_back<P: ProfileStore>(
    profiles: &P,
    profile: &UserProfile,
) -> Result<(), CoreError> {
    if !profiles.put_if_version(&profile.key(), profile, profile.version)? {
        return Err(ConflictError::ConcurrentModification(profile.email.clone()).into());
    }
    Ok(())
}
