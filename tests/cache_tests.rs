// Cache semantics: wholesale collision replacement, additive link merge,
// first-seen-wins geometry.

#[cfg(test)]
mod tests {
    use colvis::decoder::parse_payload;
    use colvis::{CollisionCache, GeomShape};

    fn apply(cache: &CollisionCache, xml: &str) {
        let update = parse_payload(xml).unwrap();
        cache.apply_update(update.collisions, update.links);
    }

    const TWO_COLLISIONS_ONE_LINK: &str = r#"<cd col_count="2">
        <c i1="0" i2="1" p1x="0" p1y="0" p1z="0" p2x="1" p2y="0" p2z="0"
           d="0.02" n1x="1" n1y="0" n1z="0" n2x="-1" n2y="0" n2z="0"/>
        <c i1="1" i2="2" p1x="0" p1y="1" p1z="0" p2x="0" p2y="2" p2z="0"
           d="-0.01" n1x="0" n1y="1" n1z="0" n2x="0" n2y="-1" n2z="0"/>
        <l idx="0" name="torso">
            <g type="SPHERE" x="0" y="0" z="0" qx="0" qy="0" qz="0" qw="1" r="0.1"/>
        </l>
    </cd>"#;

    #[test]
    fn update_replaces_collisions_and_merges_links() {
        let cache = CollisionCache::new();
        apply(&cache, TWO_COLLISIONS_ONE_LINK);

        let (collisions, links) = cache.snapshot();
        assert_eq!(collisions.len(), 2);
        assert_eq!(links.len(), 1);
        assert_eq!(links[&0].name, "torso");

        // A smaller update replaces the whole collision list.
        apply(
            &cache,
            r#"<cd><c i1="0" i2="1" p1x="0" p1y="0" p1z="0" p2x="1" p2y="0" p2z="0"
                d="0.5" n1x="1" n1y="0" n1z="0" n2x="-1" n2y="0" n2z="0"/></cd>"#,
        );
        let (collisions, links) = cache.snapshot();
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].dist, 0.5);
        assert_eq!(links.len(), 1, "links are never evicted");
    }

    #[test]
    fn link_map_grows_only_by_new_indices() {
        let cache = CollisionCache::new();
        apply(&cache, r#"<cd><l idx="0" name="torso"/></cd>"#);
        assert_eq!(cache.link_count(), 1);

        apply(
            &cache,
            r#"<cd><l idx="0" name="torso"/><l idx="1" name="head"/></cd>"#,
        );
        assert_eq!(cache.link_count(), 2);
    }

    #[test]
    fn first_seen_geometry_wins() {
        let cache = CollisionCache::new();
        apply(&cache, TWO_COLLISIONS_ONE_LINK);

        // Same index, different geometry: the cached entry must not change.
        apply(
            &cache,
            r#"<cd><l idx="0" name="torso">
                <g type="CAPSULE" x="0" y="0" z="0" qx="0" qy="0" qz="0" qw="1" r="0.2" l="0.5"/>
            </l></cd>"#,
        );

        let (_, links) = cache.snapshot();
        assert_eq!(links[&0].geoms.len(), 1);
        assert_eq!(links[&0].geoms[0].shape, GeomShape::Sphere { radius: 0.1 });
    }

    #[test]
    fn reapplying_the_same_record_is_idempotent() {
        let cache = CollisionCache::new();
        apply(&cache, TWO_COLLISIONS_ONE_LINK);
        let (first_collisions, first_links) = cache.snapshot();

        apply(&cache, TWO_COLLISIONS_ONE_LINK);
        let (second_collisions, second_links) = cache.snapshot();

        assert_eq!(*first_collisions, *second_collisions);
        assert_eq!(first_links.len(), second_links.len());
        assert_eq!(first_links[&0], second_links[&0]);
    }

    #[test]
    fn snapshot_is_detached_from_later_updates() {
        let cache = CollisionCache::new();
        apply(&cache, TWO_COLLISIONS_ONE_LINK);
        let (before, _) = cache.snapshot();

        apply(&cache, r#"<cd></cd>"#);
        assert_eq!(before.len(), 2, "old snapshot keeps its collision list");
        let (after, _) = cache.snapshot();
        assert!(after.is_empty());
    }
}
