use crate::common::error::EnrollSyncError;

/// enrollsync全体で使用するResult型のエイリアス
///
/// # Examples
///
/// ```
/// use enrollsync::common::result::EnrollSyncResult;
/// use enrollsync::infrastructure::store::StoreError;
///
/// fn example_function() -> EnrollSyncResult<String> {
///     Ok("success".to_string())
/// }
///
/// fn example_with_error() -> EnrollSyncResult<()> {
///     Err(StoreError::not_found("course 7").into())
/// }
///
/// assert_eq!(example_function().unwrap(), "success");
/// assert_eq!(
///     example_with_error().unwrap_err().kind(),
///     enrollsync::ErrorKind::NotFound
/// );
/// ```
pub type EnrollSyncResult<T> = Result<T, EnrollSyncError>;
