//! Blinn-Phong lighting functions (GLSL).
//!
//! The fragments reference the usual lighting environment without defining it:
//! `NormalView`, `PositionViewDirection`, `Material*Color`,
//! `ReflectedLight*` accumulators, `Irradiance`, `RECIPROCAL_PI`,
//! `saturate`/`pow2`/`pow4` and the `PHYSICALLY_CORRECT_LIGHTS` switch.
//! See [`crate::validation::BLINN_PHONG_PRELUDE`] for a matching declaration set.

use std::sync::LazyLock;

use crate::graph::{FunctionGraph, FunctionId, FunctionNode};

pub const F_SCHLICK: &str = r#"
vec3 F_Schlick( const in vec3 f0, const in vec3 f90, const in float dotVH ) {

	// Original approximation by Christophe Schlick '94
	// float fresnel = pow( 1.0 - dotVH, 5.0 );

	// Optimized variant (presented by Epic at SIGGRAPH '13)
	// https://cdn2.unrealengine.com/Resources/files/2013SiggraphPresentationsNotes-26915738.pdf
	float fresnel = exp2( ( -5.55473 * dotVH - 6.98316 ) * dotVH );

	return ( f90 - f0 ) * fresnel + f0;

}"#;

pub const G_BLINN_PHONG_IMPLICIT: &str = r#"
float G_BlinnPhong_Implicit() {

	// ( const in float dotNL, const in float dotNV )
	// geometry term is (n dot l)(n dot v) / 4(n dot l)(n dot v)

	return 0.25;

}"#;

pub const D_BLINN_PHONG: &str = r#"
float D_BlinnPhong( const in float shininess, const in float dotNH ) {

	return RECIPROCAL_PI * ( shininess * 0.5 + 1.0 ) * pow( dotNH, shininess );

}"#;

pub const BRDF_LAMBERT: &str = r#"
vec3 BRDF_Lambert( const in vec3 diffuseColor ) {

	return RECIPROCAL_PI * diffuseColor;

}"#;

pub const BRDF_BLINN_PHONG: &str = r#"
vec3 BRDF_BlinnPhong( vec3 lightDirection, vec3 specularColor, float shininess ) {

	vec3 halfDir = normalize( lightDirection + PositionViewDirection );

	float dotNH = saturate( dot( NormalView, halfDir ) );
	float dotVH = saturate( dot( PositionViewDirection, halfDir ) );

	vec3 F = F_Schlick( specularColor, vec3( 1.0 ), dotVH );

	float G = G_BlinnPhong_Implicit( /* dotNL, dotNV */ );

	float D = D_BlinnPhong( shininess, dotNH );

	return F * ( G * D );

}"#;

pub const PUNCTUAL_LIGHT_INTENSITY_TO_IRRADIANCE_FACTOR: &str = r#"
float punctualLightIntensityToIrradianceFactor( float lightDistance, float cutoffDistance, float decayExponent ) {

#if defined ( PHYSICALLY_CORRECT_LIGHTS )

	// based upon Frostbite 3 Moving to Physically-based Rendering
	// page 32, equation 26: E[window1]
	// https://seblagarde.files.wordpress.com/2015/07/course_notes_moving_frostbite_to_pbr_v32.pdf
	// this is intended to be used on spot and point lights who are represented as luminous intensity
	// but who must be converted to luminous irradiance for surface lighting calculation
	float distanceFalloff = 1.0 / max( pow( lightDistance, decayExponent ), 0.01 );

	if( cutoffDistance > 0.0 ) {

		distanceFalloff *= pow2( saturate( 1.0 - pow4( lightDistance / cutoffDistance ) ) );

	}

	return distanceFalloff;

#else

	if( cutoffDistance > 0.0 && decayExponent > 0.0 ) {

		return pow( saturate( -lightDistance / cutoffDistance + 1.0 ), decayExponent );

	}

	return 1.0;

#endif

}"#;

pub const RE_DIRECT_BLINN_PHONG: &str = r#"
void RE_Direct_BlinnPhong( vec3 lightDirection, vec3 lightColor ) {

	float dotNL = saturate( dot( NormalView, lightDirection ) );
	vec3 irradiance = dotNL * lightColor;

	ReflectedLightDirectDiffuse += irradiance * BRDF_Lambert( MaterialDiffuseColor.rgb );

	ReflectedLightDirectSpecular += irradiance * BRDF_BlinnPhong( lightDirection, MaterialSpecularColor, MaterialSpecularShininess );

}"#;

pub const RE_INDIRECT_DIFFUSE_BLINN_PHONG: &str = r#"
void RE_IndirectDiffuse_BlinnPhong( ) {

	ReflectedLightIndirectDiffuse += Irradiance * BRDF_Lambert( MaterialDiffuseColor.rgb );

}"#;

/// The frozen graph plus a handle for each function in it.
#[derive(Debug)]
pub struct BlinnPhongCatalog {
    pub graph: FunctionGraph,
    pub f_schlick: FunctionId,
    pub g_blinn_phong_implicit: FunctionId,
    pub d_blinn_phong: FunctionId,
    pub brdf_lambert: FunctionId,
    pub brdf_blinn_phong: FunctionId,
    pub punctual_light_intensity_to_irradiance_factor: FunctionId,
    pub re_direct_blinn_phong: FunctionId,
    pub re_indirect_diffuse_blinn_phong: FunctionId,
}

static BLINN_PHONG: LazyLock<BlinnPhongCatalog> = LazyLock::new(build_blinn_phong);

/// Process-wide Blinn-Phong catalog, built on first use.
pub fn blinn_phong() -> &'static BlinnPhongCatalog {
    &BLINN_PHONG
}

fn build_blinn_phong() -> BlinnPhongCatalog {
    let mut b = FunctionGraph::builder();

    let f_schlick = b.add(FunctionNode::new(F_SCHLICK));
    let g_blinn_phong_implicit = b.add(FunctionNode::new(G_BLINN_PHONG_IMPLICIT));
    let d_blinn_phong = b.add(FunctionNode::new(D_BLINN_PHONG));
    let brdf_lambert = b.add(FunctionNode::new(BRDF_LAMBERT));
    let brdf_blinn_phong = b.add(
        FunctionNode::new(BRDF_BLINN_PHONG)
            .with_includes([f_schlick, g_blinn_phong_implicit, d_blinn_phong]),
    );
    let punctual_light_intensity_to_irradiance_factor =
        b.add(FunctionNode::new(PUNCTUAL_LIGHT_INTENSITY_TO_IRRADIANCE_FACTOR));
    // Specular chain first, so it lands ahead of the Lambert term.
    let re_direct_blinn_phong = b.add(
        FunctionNode::new(RE_DIRECT_BLINN_PHONG).with_includes([brdf_blinn_phong, brdf_lambert]),
    );
    let re_indirect_diffuse_blinn_phong =
        b.add(FunctionNode::new(RE_INDIRECT_DIFFUSE_BLINN_PHONG).with_includes([brdf_lambert]));

    let graph = b
        .build()
        .expect("Blinn-Phong catalog only includes its own functions");

    BlinnPhongCatalog {
        graph,
        f_schlick,
        g_blinn_phong_implicit,
        d_blinn_phong,
        brdf_lambert,
        brdf_blinn_phong,
        punctual_light_intensity_to_irradiance_factor,
        re_direct_blinn_phong,
        re_indirect_diffuse_blinn_phong,
    }
}
