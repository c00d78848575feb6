//! Content resolution: which source wins for an object's displayed value.

use crate::model::{AssetIndex, LayoutObject, SlideResult};

/// First defined value among a literal override, a generated value and a
/// type default.
pub fn resolve_first<T>(literal: Option<T>, generated: Option<T>, default: T) -> T {
    literal.or(generated).unwrap_or(default)
}

/// Image URL for a bitmap object.
///
/// Order: the object's `imageUrl`, its `imageFileName` asset, the asset named
/// by the slide result, then the `<id>.png|jpg` convention.
pub fn resolve_image_url(
    object: &LayoutObject,
    result: &SlideResult,
    assets: &AssetIndex,
) -> Option<String> {
    let literal = object.image_url.clone().or_else(|| {
        object
            .image_file_name
            .as_deref()
            .and_then(|name| assets.by_name(name))
            .map(|asset| asset.url.clone())
    });
    let generated = result
        .text_for(&object.id)
        .and_then(|name| assets.by_name(&name).map(|asset| asset.url.clone()))
        .or_else(|| assets.for_object(&object.id).map(|asset| asset.url.clone()));
    resolve_first(literal.map(Some), generated.map(Some), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageAsset, ObjectKind};

    fn assets() -> AssetIndex {
        AssetIndex::new(vec![
            ImageAsset { name: "hero.png".into(), url: "signed://hero.png".into() },
            ImageAsset { name: "alt.jpg".into(), url: "signed://alt.jpg".into() },
            ImageAsset { name: "custom.png".into(), url: "signed://custom.png".into() },
        ])
    }

    #[test]
    fn test_resolve_first_order() {
        assert_eq!(resolve_first(Some(1), Some(2), 3), 1);
        assert_eq!(resolve_first(None, Some(2), 3), 2);
        assert_eq!(resolve_first(None, None, 3), 3);
    }

    #[test]
    fn test_literal_url_wins() {
        let mut result = SlideResult::default();
        result.insert("hero", "alt.jpg");
        let object =
            LayoutObject::new("hero", ObjectKind::Image).with_image_url("https://cdn/x.png");
        assert_eq!(
            resolve_image_url(&object, &result, &assets()).as_deref(),
            Some("https://cdn/x.png")
        );
    }

    #[test]
    fn test_file_name_override_beats_result() {
        let mut result = SlideResult::default();
        result.insert("hero", "alt.jpg");
        let mut object = LayoutObject::new("hero", ObjectKind::Image);
        object.image_file_name = Some("custom.png".into());
        assert_eq!(
            resolve_image_url(&object, &result, &assets()).as_deref(),
            Some("signed://custom.png")
        );
    }

    #[test]
    fn test_result_file_name_then_convention() {
        let mut result = SlideResult::default();
        result.insert("hero", "alt.jpg");
        let object = LayoutObject::new("hero", ObjectKind::Image);
        assert_eq!(
            resolve_image_url(&object, &result, &assets()).as_deref(),
            Some("signed://alt.jpg")
        );

        let empty = SlideResult::default();
        assert_eq!(
            resolve_image_url(&object, &empty, &assets()).as_deref(),
            Some("signed://hero.png")
        );
    }

    #[test]
    fn test_nothing_resolves() {
        let object = LayoutObject::new("ghost", ObjectKind::Logo);
        assert!(resolve_image_url(&object, &SlideResult::default(), &assets()).is_none());
    }
}
