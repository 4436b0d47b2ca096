//! Air/surface sector restriction 11.

use crate::restrictions::{apply, RestrictionContext, RestrictionValidator};
use crate::routing::types::{AirSurface, RoutingRestriction};
use crate::travel::types::TravelRoute;

/// Between market1 and market2 the sector must (not) be flown or traveled by surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct AirSurfaceRestrictionValidator;

impl RestrictionValidator for AirSurfaceRestrictionValidator {
    fn validate(&self, route: &TravelRoute, r: &RoutingRestriction, ctx: &RestrictionContext<'_>) -> bool {
        let sector = route.route.iter().find(|cc| {
            (ctx.loc_matches(&cc.board, &r.market1, r.market1_type)
                && ctx.loc_matches(&cc.off, &r.market2, r.market2_type))
                || (ctx.loc_matches(&cc.board, &r.market2, r.market2_type)
                    && ctx.loc_matches(&cc.off, &r.market1, r.market1_type))
        });
        let Some(sector) = sector else {
            return true;
        };
        let satisfied = match r.air_surface {
            AirSurface::Air => !sector.is_surface(),
            AirSurface::Surface => sector.is_surface(),
            AirSurface::Either | AirSurface::Blank => true,
        };
        apply(r.appl, satisfied)
    }
}
